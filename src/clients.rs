use aws_config::SdkConfig;
use aws_sdk_dynamodb::Client as DynamoDbClient;

/// A type used to hold the AWS clients required to interact with AWS services
/// used by the lambda function.
#[derive(Clone)]
pub struct AwsClients {
    pub dynamodb: DynamoDbClient,
}

impl AwsClients {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        AwsClients {
            dynamodb: DynamoDbClient::new(sdk_config),
        }
    }
}
