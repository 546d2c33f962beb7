//! Arrow Flight query service for the telemetry cache.
//!
//! Only `do_get` and `get_schema` are served. A `do_get` ticket carries a
//! JSON command:
//!
//! ```json
//! {"type": "latest"}
//! {"type": "range", "data": {"from_ns": 1700000000000000000, "to_ns": 1700000060000000000}}
//! ```
//!
//! Each matching record goes out as its own single-row record batch, so a
//! client can start consuming before the last record is encoded.

use crate::query::TelemetryQuery;
use crate::record::Record;
use crate::schema::{create_record_batch, get_record_schema};
use arrow_flight::{
    encode::FlightDataEncoderBuilder,
    error::FlightError,
    flight_service_server::FlightService,
    Action, ActionType, Criteria, Empty, FlightData, FlightDescriptor, FlightInfo,
    HandshakeRequest, HandshakeResponse, PollInfo, PutResult, SchemaAsIpc, SchemaResult, Ticket,
};
use arrow_ipc::writer::IpcWriteOptions;
use chrono::DateTime;
use futures::{stream, Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};

/// Commands understood by `do_get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum QueryCommand {
    Latest,
    Range { from_ns: i64, to_ns: i64 },
}

impl QueryCommand {
    pub fn from_json(cmd: &[u8]) -> Result<Self, Status> {
        serde_json::from_slice(cmd)
            .map_err(|e| Status::invalid_argument(format!("Invalid query command: {}", e)))
    }

    pub fn to_ticket(&self) -> Result<Ticket, Status> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| Status::internal(format!("Failed to encode query command: {}", e)))?;
        Ok(Ticket::new(bytes))
    }
}

pub struct TelemetryFlightService {
    query: TelemetryQuery,
}

impl TelemetryFlightService {
    pub fn new(query: TelemetryQuery) -> Self {
        Self { query }
    }

    fn encode<S>(records: S) -> <Self as FlightService>::DoGetStream
    where
        S: Stream<Item = Record> + Send + 'static,
    {
        let batches = records.map(|record| {
            create_record_batch(&[record]).map_err(FlightError::from)
        });

        let encoded = FlightDataEncoderBuilder::new()
            .with_schema(Arc::new(get_record_schema()))
            .build(batches)
            .map_err(Status::from);

        Box::pin(encoded)
    }
}

#[tonic::async_trait]
impl FlightService for TelemetryFlightService {
    type HandshakeStream = Pin<Box<dyn Stream<Item = Result<HandshakeResponse, Status>> + Send + 'static>>;
    type ListFlightsStream = Pin<Box<dyn Stream<Item = Result<FlightInfo, Status>> + Send + 'static>>;
    type DoGetStream = Pin<Box<dyn Stream<Item = Result<FlightData, Status>> + Send + 'static>>;
    type DoPutStream = Pin<Box<dyn Stream<Item = Result<PutResult, Status>> + Send + 'static>>;
    type DoActionStream = Pin<Box<dyn Stream<Item = Result<arrow_flight::Result, Status>> + Send + 'static>>;
    type ListActionsStream = Pin<Box<dyn Stream<Item = Result<ActionType, Status>> + Send + 'static>>;
    type DoExchangeStream = Pin<Box<dyn Stream<Item = Result<FlightData, Status>> + Send + 'static>>;

    async fn get_schema(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<SchemaResult>, Status> {
        let schema = get_record_schema();
        let result: SchemaResult = SchemaAsIpc::new(&schema, &IpcWriteOptions::default())
            .try_into()
            .map_err(|e| Status::internal(format!("Failed to encode schema: {}", e)))?;
        Ok(Response::new(result))
    }

    async fn do_get(
        &self,
        request: Request<Ticket>,
    ) -> Result<Response<Self::DoGetStream>, Status> {
        let command = QueryCommand::from_json(&request.into_inner().ticket)?;
        tracing::debug!(?command, "do_get");

        let output = match command {
            QueryCommand::Latest => {
                let record = self.query.get_latest()?;
                Self::encode(stream::once(async move { record }))
            }
            QueryCommand::Range { from_ns, to_ns } => {
                let from = DateTime::from_timestamp_nanos(from_ns);
                let to = DateTime::from_timestamp_nanos(to_ns);
                Self::encode(self.query.get_range(from, to)?)
            }
        };

        Ok(Response::new(output))
    }

    async fn handshake(
        &self,
        _request: Request<Streaming<HandshakeRequest>>,
    ) -> Result<Response<Self::HandshakeStream>, Status> {
        Err(Status::unimplemented("handshake not implemented"))
    }

    async fn list_flights(
        &self,
        _request: Request<Criteria>,
    ) -> Result<Response<Self::ListFlightsStream>, Status> {
        Err(Status::unimplemented("list_flights not implemented"))
    }

    async fn get_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        Err(Status::unimplemented("get_flight_info not implemented"))
    }

    async fn poll_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<PollInfo>, Status> {
        Err(Status::unimplemented("poll_flight_info not implemented"))
    }

    async fn do_put(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoPutStream>, Status> {
        Err(Status::unimplemented("the telemetry cache is read-only"))
    }

    async fn do_action(
        &self,
        _request: Request<Action>,
    ) -> Result<Response<Self::DoActionStream>, Status> {
        Err(Status::unimplemented("do_action not implemented"))
    }

    async fn list_actions(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListActionsStream>, Status> {
        Err(Status::unimplemented("list_actions not implemented"))
    }

    async fn do_exchange(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoExchangeStream>, Status> {
        Err(Status::unimplemented("the telemetry cache is read-only"))
    }
}
