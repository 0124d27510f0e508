use crate::aggregation::AggregationDecoder;
use crate::config::Config;
use crate::error::Result;
use crate::query::{
    FederatedQueryNoticesRequest, FederatedQueryRequest, QueryNoticesRequest, QueryNoticesResponse,
    QueryRequest, QueryResponse,
};
use crate::transport::{HttpTransport, Transport};

/// Query client: builds the wire request, hands it to the transport and
/// decodes the response.
pub struct DiscoveryClient<T: Transport = HttpTransport> {
    transport: T,
    decoder: AggregationDecoder,
}

impl DiscoveryClient<HttpTransport> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::from_config(&config.service)?;
        Ok(Self::new(transport).with_decoder(config.decode.decoder()))
    }
}

impl<T: Transport> DiscoveryClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            decoder: AggregationDecoder::default(),
        }
    }

    pub fn with_decoder(mut self, decoder: AggregationDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn decoder(&self) -> &AggregationDecoder {
        &self.decoder
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        tracing::debug!(
            "Querying collection {} in environment {}",
            request.collection_id,
            request.environment_id
        );
        let body = self.transport.execute(request.to_wire()?).await?;
        QueryResponse::from_value(body, &self.decoder)
    }

    pub async fn query_notices(
        &self,
        request: &QueryNoticesRequest,
    ) -> Result<QueryNoticesResponse> {
        tracing::debug!(
            "Querying notices of collection {} in environment {}",
            request.collection_id,
            request.environment_id
        );
        let body = self.transport.execute(request.to_wire()?).await?;
        QueryNoticesResponse::from_value(body, &self.decoder)
    }

    pub async fn federated_query(&self, request: &FederatedQueryRequest) -> Result<QueryResponse> {
        tracing::debug!(
            "Federated query over {} collections in environment {}",
            request.collection_ids.len(),
            request.environment_id
        );
        let body = self.transport.execute(request.to_wire()?).await?;
        QueryResponse::from_value(body, &self.decoder)
    }

    pub async fn federated_query_notices(
        &self,
        request: &FederatedQueryNoticesRequest,
    ) -> Result<QueryNoticesResponse> {
        tracing::debug!(
            "Federated notices query over {} collections in environment {}",
            request.collection_ids.len(),
            request.environment_id
        );
        let body = self.transport.execute(request.to_wire()?).await?;
        QueryNoticesResponse::from_value(body, &self.decoder)
    }
}
