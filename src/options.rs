//! Command options and the settings threaded through every stack program.
//!
//! Each command's options can come from the CLI or from the matching section
//! of the project config file. CLI values win.

use std::fmt;
use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::aws::CloudIdentity;

pub const DEFAULT_CUSTOM_DOMAIN: &str = "example.com";

#[derive(Debug, Clone, Default, PartialEq, Args, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InitOptions {
    /// AWS region, e.g. us-west-1
    #[arg(long)]
    #[validate(custom = "validate_region")]
    pub aws_region: Option<String>,

    /// Pulumi organization, required for cross-stack references on the Pulumi service
    #[arg(long)]
    #[validate(length(min = 1))]
    pub pulumi_organization: Option<String>,

    /// Custom domain, e.g. my-domain.com (defaults to example.com)
    #[arg(long)]
    #[validate(length(min = 1))]
    pub custom_domain: Option<String>,

    /// Route53 hosted zone id of the custom domain
    #[arg(long)]
    #[validate(length(min = 1))]
    pub custom_domain_zone_id: Option<String>,

    /// E-mail address registered with the ACME issuer
    #[arg(long)]
    #[validate(email)]
    pub acme_email: Option<String>,

    /// Write an .envrc exporting KUBECONFIG for direnv
    #[arg(long)]
    pub use_direnv: Option<bool>,

    #[arg(long)]
    #[validate(length(min = 1))]
    pub db_user: Option<String>,

    #[arg(long)]
    #[validate(length(min = 8))]
    pub db_password: Option<String>,

    #[arg(long)]
    #[validate(length(min = 1))]
    pub grafana_user: Option<String>,

    #[arg(long)]
    #[validate(length(min = 8))]
    pub grafana_password: Option<String>,

    /// Overrides the default init stack list
    #[arg(long, value_delimiter = ',')]
    #[serde(default)]
    pub stacks: Vec<String>,
}

impl InitOptions {
    pub fn layered(self, file: &InitOptions) -> InitOptions {
        return InitOptions {
            aws_region: self.aws_region.or_else(|| file.aws_region.clone()),
            pulumi_organization: self
                .pulumi_organization
                .or_else(|| file.pulumi_organization.clone()),
            custom_domain: self.custom_domain.or_else(|| file.custom_domain.clone()),
            custom_domain_zone_id: self
                .custom_domain_zone_id
                .or_else(|| file.custom_domain_zone_id.clone()),
            acme_email: self.acme_email.or_else(|| file.acme_email.clone()),
            use_direnv: self.use_direnv.or(file.use_direnv),
            db_user: self.db_user.or_else(|| file.db_user.clone()),
            db_password: self.db_password.or_else(|| file.db_password.clone()),
            grafana_user: self.grafana_user.or_else(|| file.grafana_user.clone()),
            grafana_password: self.grafana_password.or_else(|| file.grafana_password.clone()),
            stacks: if self.stacks.is_empty() {
                file.stacks.clone()
            } else {
                self.stacks
            },
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Args, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppOptions {
    /// Build and push the app image before deploying
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub build: Option<bool>,

    /// Deploy this image instead of building one
    #[arg(long)]
    #[validate(length(min = 1))]
    pub image_url: Option<String>,

    /// Provision a database per environment
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub create_db: Option<bool>,

    #[arg(long)]
    #[validate(length(min = 1))]
    pub staging_db_user: Option<String>,

    #[arg(long)]
    #[validate(length(min = 8))]
    pub staging_db_password: Option<String>,

    #[arg(long)]
    #[validate(length(min = 1))]
    pub prod_db_user: Option<String>,

    #[arg(long)]
    #[validate(length(min = 8))]
    pub prod_db_password: Option<String>,
}

impl AppOptions {
    pub fn layered(self, file: &AppOptions) -> AppOptions {
        return AppOptions {
            build: self.build.or(file.build),
            image_url: self.image_url.or_else(|| file.image_url.clone()),
            create_db: self.create_db.or(file.create_db),
            staging_db_user: self.staging_db_user.or_else(|| file.staging_db_user.clone()),
            staging_db_password: self
                .staging_db_password
                .or_else(|| file.staging_db_password.clone()),
            prod_db_user: self.prod_db_user.or_else(|| file.prod_db_user.clone()),
            prod_db_password: self.prod_db_password.or_else(|| file.prod_db_password.clone()),
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Args, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DestroyOptions {
    /// Keep the identity, cluster and karpenter stacks
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub keep_cluster: Option<bool>,

    /// Remove the stack records and local mirrors after destroying
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub remove_stacks: Option<bool>,
}

impl DestroyOptions {
    pub fn layered(self, file: &DestroyOptions) -> DestroyOptions {
        return DestroyOptions {
            keep_cluster: self.keep_cluster.or(file.keep_cluster),
            remove_stacks: self.remove_stacks.or(file.remove_stacks),
        };
    }
}

fn validate_region(region: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return Err(ValidationError::new(
            "The AWS region has to look like `us-west-1`",
        ));
    }

    let well_formed = parts.iter().all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    });
    let numbered = parts
        .last()
        .map(|part| part.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false);
    if !well_formed || !numbered {
        return Err(ValidationError::new(
            "The AWS region has to look like `us-west-1`",
        ));
    }

    return Ok(());
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Everything a stack program may read, passed explicitly to each program.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub project: String,
    pub project_root: PathBuf,
    pub organization: Option<String>,
    pub aws_region: Option<String>,
    pub aws_account_id: Option<String>,
    pub custom_domain: Option<String>,
    pub custom_domain_zone_id: Option<String>,
    pub acme_email: Option<String>,
    pub grafana_user: Option<String>,
    pub grafana_password: Option<String>,
    pub image_url: Option<String>,

    /// The run applies `app-build`, so its image replaces `image_url`.
    pub build: bool,

    pub staging_db: DbCredentials,
    pub prod_db: DbCredentials,
}

impl Settings {
    pub fn new(project: impl Into<String>, project_root: PathBuf) -> Self {
        return Self {
            project: project.into(),
            project_root,
            custom_domain: Some(DEFAULT_CUSTOM_DOMAIN.to_string()),
            ..Default::default()
        };
    }

    pub fn with_identity(mut self, identity: &CloudIdentity) -> Self {
        self.aws_region = Some(identity.region.clone());
        self.aws_account_id = identity.account_id.clone();
        return self;
    }

    /// The shared `db_user`/`db_password` from `init` apply to both
    /// environments unless `app` sets per-environment credentials.
    pub fn with_init(mut self, init: &InitOptions) -> Self {
        self.organization = init.pulumi_organization.clone();
        if init.aws_region.is_some() {
            self.aws_region = init.aws_region.clone();
        }
        if init.custom_domain.is_some() {
            self.custom_domain = init.custom_domain.clone();
        }
        self.custom_domain_zone_id = init.custom_domain_zone_id.clone();
        self.acme_email = init.acme_email.clone();
        self.grafana_user = init.grafana_user.clone();
        self.grafana_password = init.grafana_password.clone();

        let shared = DbCredentials {
            user: init.db_user.clone(),
            password: init.db_password.clone(),
        };
        self.staging_db = shared.clone();
        self.prod_db = shared;
        return self;
    }

    pub fn with_app(mut self, app: &AppOptions) -> Self {
        self.build = app.build.unwrap_or(false);
        if app.image_url.is_some() {
            self.image_url = app.image_url.clone();
        }
        if app.staging_db_user.is_some() {
            self.staging_db.user = app.staging_db_user.clone();
        }
        if app.staging_db_password.is_some() {
            self.staging_db.password = app.staging_db_password.clone();
        }
        if app.prod_db_user.is_some() {
            self.prod_db.user = app.prod_db_user.clone();
        }
        if app.prod_db_password.is_some() {
            self.prod_db.password = app.prod_db_password.clone();
        }
        return self;
    }

    pub fn get(&self, setting: Setting) -> Option<&str> {
        let value = match setting {
            Setting::Project => return Some(self.project.as_str()),
            Setting::ProjectRoot => return self.project_root.to_str(),
            Setting::Organization => &self.organization,
            Setting::AwsRegion => &self.aws_region,
            Setting::AwsAccountId => &self.aws_account_id,
            Setting::CustomDomain => &self.custom_domain,
            Setting::CustomDomainZoneId => &self.custom_domain_zone_id,
            Setting::AcmeEmail => &self.acme_email,
            Setting::GrafanaUser => &self.grafana_user,
            Setting::GrafanaPassword => &self.grafana_password,
            Setting::ImageUrl => &self.image_url,
            Setting::StagingDbUser => &self.staging_db.user,
            Setting::StagingDbPassword => &self.staging_db.password,
            Setting::ProdDbUser => &self.prod_db.user,
            Setting::ProdDbPassword => &self.prod_db.password,
        };

        return value.as_deref();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Project,
    ProjectRoot,
    Organization,
    AwsRegion,
    AwsAccountId,
    CustomDomain,
    CustomDomainZoneId,
    AcmeEmail,
    GrafanaUser,
    GrafanaPassword,
    ImageUrl,
    StagingDbUser,
    StagingDbPassword,
    ProdDbUser,
    ProdDbPassword,
}

impl Setting {
    /// Name of the CLI flag that supplies the setting.
    pub fn flag(&self) -> &'static str {
        match self {
            Setting::Project => "name in Pulumi.yaml",
            Setting::ProjectRoot => "working directory",
            Setting::Organization => "--pulumi-organization",
            Setting::AwsRegion => "--aws-region",
            Setting::AwsAccountId => "AWS credentials",
            Setting::CustomDomain => "--custom-domain",
            Setting::CustomDomainZoneId => "--custom-domain-zone-id",
            Setting::AcmeEmail => "--acme-email",
            Setting::GrafanaUser => "--grafana-user",
            Setting::GrafanaPassword => "--grafana-password",
            Setting::ImageUrl => "--image-url",
            Setting::StagingDbUser => "--staging-db-user",
            Setting::StagingDbPassword => "--staging-db-password",
            Setting::ProdDbUser => "--prod-db-user",
            Setting::ProdDbPassword => "--prod-db-password",
        }
    }

    pub fn is_secret(&self) -> bool {
        return matches!(
            self,
            Setting::GrafanaPassword | Setting::StagingDbPassword | Setting::ProdDbPassword
        );
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.flag());
    }
}
