//! Programs for every stack the tool knows how to apply.

use crate::options::Setting;
use crate::workspace::Plugin;

use super::{Dependency, ProgramRegistry, StackProgram};

pub const IDENTITY: &str = "identity";
pub const CLUSTER: &str = "cluster";
pub const CLUSTER_AUTOSCALER: &str = "cluster-autoscaler";
pub const KARPENTER: &str = "karpenter";
pub const CERT_MANAGER: &str = "cert-manager";
pub const EMISSARY: &str = "emissary";
pub const DAPR: &str = "dapr";
pub const KUBE_PROMETHEUS_STACK: &str = "kube-prometheus-stack";
pub const GRAFANA_DASHBOARD: &str = "grafana-dashboard";
pub const APP_BUILD: &str = "app-build";
pub const APP_NS: &str = "app-ns";
pub const DB_STAGING: &str = "db-staging";
pub const APP_STAGING: &str = "app-staging";
pub const DB_PROD: &str = "db-prod";
pub const APP_PROD: &str = "app-prod";

pub const APP_STAGING_NAMESPACE: &str = "app-staging";
pub const APP_PROD_NAMESPACE: &str = "app-prod";
pub const KNATIVE_HTTPS_INGRESS_GATEWAY: &str = "knative-https-ingress-gateway";
pub const KUBE_PROMETHEUS_STACK_NAMESPACE: &str = "kube-prometheus-stack";

fn aws() -> Plugin {
    return Plugin::resource("aws", "5.30.0");
}

fn awsx() -> Plugin {
    return Plugin::resource("awsx", "1.0.2");
}

fn eks() -> Plugin {
    return Plugin::resource("eks", "1.0.1");
}

fn kubernetes() -> Plugin {
    return Plugin::resource("kubernetes", "3.23.1");
}

fn random() -> Plugin {
    return Plugin::resource("random", "4.10.0");
}

/// Every stack except `cluster` talks to the cluster through its kubeconfig.
fn on_cluster() -> Dependency {
    return Dependency::required(CLUSTER).secret_output("kubeconfig", "kubeconfig");
}

fn with_account(program: StackProgram) -> StackProgram {
    return program
        .input("aws_account_id", Setting::AwsAccountId)
        .input("aws_region", Setting::AwsRegion);
}

fn database(namespace: &str, user: Setting, password: Setting) -> StackProgram {
    return StackProgram::new()
        .plugin(aws())
        .plugin(awsx())
        .plugin(kubernetes())
        .plugin(random())
        .input("db_user", user)
        .input("db_password", password)
        .constant("app_namespace_name", namespace)
        .depends_on(
            on_cluster()
                .output("vpcId", "vpc_id")
                .output("vpcPublicSubnetIds", "vpc_public_subnet_ids"),
        );
}

fn app(
    env: &str,
    namespace: &str,
    db_stack: &str,
    user: Setting,
    password: Setting,
) -> StackProgram {
    return StackProgram::new()
        .plugin(kubernetes())
        .input("project_root_path", Setting::ProjectRoot)
        .input("custom_domain", Setting::CustomDomain)
        .optional_input("image_url", Setting::ImageUrl)
        .optional_input("db_user", user)
        .optional_input("db_password", password)
        .constant("stack_env", env)
        .constant("app_namespace_name", namespace)
        .constant("knative_https_ingress_gateway_name", KNATIVE_HTTPS_INGRESS_GATEWAY)
        .depends_on(on_cluster())
        .depends_on(
            Dependency::optional(db_stack)
                .output("rdsName", "db_name")
                .output("rdsEndpoint", "db_endpoint")
                .output("rdsPort", "db_port"),
        )
        // An image built by this run takes precedence over `--image-url`.
        // A leftover `app-build` stack is ignored without `--build`.
        .depends_on(
            Dependency::optional(APP_BUILD)
                .output("imageUrl", "image_url")
                .only_if(|settings| settings.build),
        );
}

/// The registry with a program for each stack above.
pub fn builtin() -> ProgramRegistry {
    let mut registry = ProgramRegistry::new();

    registry.register(IDENTITY, with_account(StackProgram::new().plugin(aws())));

    registry.register(
        CLUSTER,
        StackProgram::new()
            .plugin(aws())
            .plugin(awsx())
            .plugin(eks())
            .plugin(kubernetes())
            .input("project", Setting::Project),
    );

    registry.register(
        CLUSTER_AUTOSCALER,
        with_account(StackProgram::new().plugin(aws()).plugin(kubernetes())).depends_on(
            on_cluster()
                .output("clusterName", "cluster_name")
                .output("eksHash", "eks_hash"),
        ),
    );

    registry.register(
        KARPENTER,
        with_account(StackProgram::new().plugin(aws()).plugin(kubernetes())).depends_on(
            on_cluster()
                .output("clusterName", "cluster_name")
                .output("clusterEndpoint", "cluster_endpoint")
                .output("eksHash", "eks_hash"),
        ),
    );

    registry.register(
        CERT_MANAGER,
        with_account(StackProgram::new().plugin(aws()).plugin(kubernetes()))
            .input("custom_domain", Setting::CustomDomain)
            .input("custom_domain_zone_id", Setting::CustomDomainZoneId)
            .input("acme_email", Setting::AcmeEmail)
            .depends_on(on_cluster().output("eksHash", "eks_hash")),
    );

    registry.register(
        EMISSARY,
        StackProgram::new()
            .plugin(kubernetes())
            .input("custom_domain", Setting::CustomDomain)
            .depends_on(on_cluster()),
    );

    registry.register(DAPR, StackProgram::new().plugin(kubernetes()).depends_on(on_cluster()));

    registry.register(
        KUBE_PROMETHEUS_STACK,
        StackProgram::new()
            .plugin(kubernetes())
            .input("custom_domain", Setting::CustomDomain)
            .input("grafana_user", Setting::GrafanaUser)
            .input("grafana_password", Setting::GrafanaPassword)
            .constant("kube_prometheus_stack_namespace_name", KUBE_PROMETHEUS_STACK_NAMESPACE)
            .constant("knative_https_ingress_gateway_name", KNATIVE_HTTPS_INGRESS_GATEWAY)
            .depends_on(on_cluster()),
    );

    registry.register(
        GRAFANA_DASHBOARD,
        StackProgram::new()
            .plugin(kubernetes())
            .constant("kube_prometheus_stack_namespace_name", KUBE_PROMETHEUS_STACK_NAMESPACE)
            .depends_on(on_cluster())
            .depends_on(Dependency::required(KUBE_PROMETHEUS_STACK)),
    );

    registry.register(
        APP_BUILD,
        StackProgram::new()
            .plugin(aws())
            .plugin(awsx())
            .input("project", Setting::Project)
            .input("project_root_dir", Setting::ProjectRoot),
    );

    registry.register(
        APP_NS,
        StackProgram::new()
            .plugin(kubernetes())
            .constant("app_staging_namespace_name", APP_STAGING_NAMESPACE)
            .constant("app_prod_namespace_name", APP_PROD_NAMESPACE)
            .depends_on(on_cluster()),
    );

    registry.register(
        DB_STAGING,
        database(APP_STAGING_NAMESPACE, Setting::StagingDbUser, Setting::StagingDbPassword),
    );
    registry.register(
        APP_STAGING,
        app(
            "staging",
            APP_STAGING_NAMESPACE,
            DB_STAGING,
            Setting::StagingDbUser,
            Setting::StagingDbPassword,
        ),
    );

    registry.register(
        DB_PROD,
        database(APP_PROD_NAMESPACE, Setting::ProdDbUser, Setting::ProdDbPassword),
    );
    registry.register(
        APP_PROD,
        app("prod", APP_PROD_NAMESPACE, DB_PROD, Setting::ProdDbUser, Setting::ProdDbPassword),
    );

    return registry;
}
