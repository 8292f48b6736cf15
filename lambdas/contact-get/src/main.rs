use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use repository::config::{AwsSettings, RegistrarConfig};
use repository::dynamo::DynamoStore;
use repository::registrar::ContactRegistrar;
use repository::store::RecordStore;
use response::{bad_request, not_found, ok, server_error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // required to enable CloudWatch error logging by the runtime
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::INFO)
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .with_target(false)
        .init();

    let shared_config = AwsSettings::from_env()?.load().await;
    let registrar_ref = &ContactRegistrar::new(
        DynamoStore::new(&shared_config),
        RegistrarConfig::from_env()?,
    );

    run(service_fn(move |event: Request| async move {
        Ok::<_, Error>(match event.path_parameters().first("id") {
            Some(id) => lookup(registrar_ref, id).await,
            None => bad_request("Expected id"),
        })
    }))
    .await?;
    Ok(())
}

async fn lookup<S>(registrar: &ContactRegistrar<S>, id: &str) -> Response<Body>
where
    S: RecordStore,
{
    match registrar.lookup(id).await {
        Ok(contact) => ok(contact),
        Err(err) if err.is_not_found() => not_found(&err.to_string()),
        Err(err) => {
            tracing::error!(id, error = %err, "lookup failed");
            server_error(&err.to_string())
        }
    }
}
