use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use model::contact::ContactRequest;
use repository::config::{AwsSettings, RegistrarConfig};
use repository::dynamo::DynamoStore;
use repository::registrar::ContactRegistrar;
use repository::store::{RecordStore, TableCatalog};
use serde::Serialize;

#[derive(Serialize, Debug, PartialEq)]
struct Response {
    id: String,
}

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

    let aws_settings = AwsSettings::from_env()?;
    let config = RegistrarConfig::from_env()?;
    tracing::info!(region = %aws_settings.region, table = %config.table_name, status = %config.status, "starting");

    let shared_config = aws_settings.load().await;
    let registrar_ref = &ContactRegistrar::new(DynamoStore::new(&shared_config), config);

    run(service_fn(
        move |event: LambdaEvent<ContactRequest>| async move {
            register(registrar_ref, event.payload).await
        },
    ))
    .await?;
    Ok(())
}

async fn register<S>(
    registrar: &ContactRegistrar<S>,
    request: ContactRequest,
) -> Result<Response, Error>
where
    S: TableCatalog + RecordStore,
{
    match registrar.register(request).await {
        Ok(contact) => Ok(Response { id: contact.id }),
        Err(err) => {
            tracing::error!(step = %err.step(), error = %err, "registration failed");
            Err(err.into())
        }
    }
}
