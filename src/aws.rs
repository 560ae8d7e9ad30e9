use aws_config::meta::region::RegionProviderChain;
use aws_types::region::Region;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Service error ocurred: {0}.")]
    ServiceError(String),

    #[error("Unknown error ocurred: {0}.")]
    UnknownError(String),

    #[error("No AWS region configured, pass --aws-region or set AWS_REGION")]
    RegionNotFound,
}

/// Region and account of the ambient AWS credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudIdentity {
    pub region: String,
    pub account_id: Option<String>,
}

/// `provided` wins over the default provider chain.
async fn region(provided: Option<&String>) -> Result<Region, Error> {
    if let Some(provided_region) = provided {
        return Ok(Region::new(provided_region.clone()));
    }

    match RegionProviderChain::default_provider().region().await {
        Some(region) => Ok(region),
        None => Err(Error::RegionNotFound),
    }
}

impl CloudIdentity {
    pub async fn resolve(provided_region: Option<&String>) -> Result<Self, Error> {
        let region = region(provided_region).await?;

        let region_for_config = region.clone();
        let sdk_config = aws_config::from_env()
            .region(region_for_config)
            .load()
            .await;
        let client = aws_sdk_sts::Client::new(&sdk_config);

        let result = client.get_caller_identity().send().await;
        let identity = match result {
            Ok(data) => data,
            Err(aws_sdk_sts::types::SdkError::ServiceError { err, .. }) => {
                return Err(Error::ServiceError(err.to_string()));
            }
            Err(err) => return Err(Error::UnknownError(err.to_string())),
        };

        let account_id = identity.account().map(String::from);
        let region_name: &str = region.as_ref();
        tracing::debug!(region = region_name, account = ?account_id, "resolved AWS identity");

        return Ok(Self {
            region: region_name.to_string(),
            account_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::region;

    #[tokio::test]
    async fn provided_region_skips_the_provider_chain() {
        let provided = String::from("eu-central-1");

        let region = region(Some(&provided)).await.unwrap();

        assert_eq!("eu-central-1", region.as_ref());
    }
}
