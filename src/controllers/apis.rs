use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::{Metadata, NamespaceResourceScope, Resource};
use serde::{Deserialize, Serialize};

/// Binds a Service or an Ingress load balancer to an existing accelerator endpoint group.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointGroupBinding {
    pub metadata: ObjectMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<EndpointGroupBindingSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EndpointGroupBindingStatus>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointGroupBindingSpec {
    #[serde(rename = "endpointGroupArn")]
    pub endpoint_group_arn: String,
    #[serde(default, rename = "clientIPPreservation")]
    pub client_ip_preservation: bool,
    pub weight: Option<i32>,
    pub service_ref: Option<LocalObjectReference>,
    pub ingress_ref: Option<LocalObjectReference>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointGroupBindingStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoint_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Resource for EndpointGroupBinding {
    const API_VERSION: &'static str = "operator.h3poteto.dev/v1alpha1";
    const GROUP: &'static str = "operator.h3poteto.dev";
    const KIND: &'static str = "EndpointGroupBinding";
    const VERSION: &'static str = "v1alpha1";
    const URL_PATH_SEGMENT: &'static str = "endpointgroupbindings";

    type Scope = NamespaceResourceScope;
}

impl Metadata for EndpointGroupBinding {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}
