use aws_config::BehaviorVersion;
use aws_lambda_events::apigw::ApiGatewayProxyRequest;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shortcut_dora_webhook::config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    shortcut_dora_webhook::set_up_logging();

    info!(
        "Initializing {} version {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let aws_config = aws_config::load_defaults(BehaviorVersion::v2023_11_09()).await;
    let clients = shortcut_dora_webhook::clients::AwsClients::new(&aws_config);
    let mut config = config::Config::load_from_env()?;

    // if the token provided is an ARN, get the token from Secrets Manager
    if config::is_secret_arn(&config.shortcut_token) {
        config.shortcut_token =
            config::get_token_from_secrets_manager(&aws_config, config.shortcut_token.clone())
                .await?;
    }
    info!("Loaded configuration: {:?}", config);

    let app = shortcut_dora_webhook::App::from_config(&config, &clients)?;

    run(service_fn(|request: LambdaEvent<ApiGatewayProxyRequest>| {
        shortcut_dora_webhook::function_handler(&app, request)
    }))
    .await
}
