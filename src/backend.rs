//! Abstract backend the gateway forwards to.
//!
//! Every operation the dispatcher can trigger is one [`BackendCall`] variant
//! carrying exactly the arguments that operation takes. Implementations decide
//! how a call travels; the dispatcher only builds the call and relays the result.

use crate::coercion::StringifiedBool;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

/// Tuning options shared by both binary matching entry points
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryMatchOptions {
    pub minhash_threshold: Option<u64>,
    pub pichash_size: Option<u64>,
    pub band_matches_required: Option<u64>,
    pub disassemble_locally: bool,
    pub force_recalculation: StringifiedBool,
}

/// Job queue listing parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueQuery {
    pub start: u64,
    pub limit: u64,
    pub method: Option<String>,
    pub filter: Option<String>,
    pub state: Option<String>,
    pub ascending: StringifiedBool,
}

/// One backend operation with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    GetStatus,
    GetVersion,
    GetFunctionsBySampleId(u64),
    GetSampleById(u64),
    GetSampleBySha256(String),
    GetSamples {
        start: u64,
        limit: u64,
    },
    AddReport(Value),
    GetFamily {
        family_id: u64,
        with_samples: bool,
    },
    GetFamilies,
    GetFunctionById {
        function_id: u64,
        with_xcfg: bool,
    },
    GetFunctions {
        start: u64,
        limit: u64,
    },
    GetFunctionsByIds {
        function_ids: Vec<u64>,
        with_label_only: bool,
    },
    GetMatchesForSmdaFunction(Value),
    GetMatchesForPicHash {
        pichash: u64,
        summary: bool,
    },
    GetMatchesForPicBlockHash {
        picblockhash: u64,
        summary: bool,
    },
    GetQueueData(QueueQuery),
    GetJobData(String),
    GetResultForJob(String),
    GetResult(String),
    GetJobForResult(String),
    // Sample and function ids stay strings here, exactly as captured
    RequestMatchesForSample(String),
    RequestMatchesForSampleVs {
        sample_id: String,
        other_sample_id: String,
    },
    GetMatchFunctionVs {
        function_id: String,
        other_function_id: Option<String>,
    },
    RequestMatchesForMappedBinary {
        binary: Bytes,
        base_address: String,
        options: BinaryMatchOptions,
    },
    RequestMatchesForUnmappedBinary {
        binary: Bytes,
        options: BinaryMatchOptions,
    },
}

impl BackendCall {
    /// Operation name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            BackendCall::GetStatus => "get_status",
            BackendCall::GetVersion => "get_version",
            BackendCall::GetFunctionsBySampleId(_) => "get_functions_by_sample_id",
            BackendCall::GetSampleById(_) => "get_sample_by_id",
            BackendCall::GetSampleBySha256(_) => "get_sample_by_sha256",
            BackendCall::GetSamples { .. } => "get_samples",
            BackendCall::AddReport(_) => "add_report",
            BackendCall::GetFamily { .. } => "get_family",
            BackendCall::GetFamilies => "get_families",
            BackendCall::GetFunctionById { .. } => "get_function_by_id",
            BackendCall::GetFunctions { .. } => "get_functions",
            BackendCall::GetFunctionsByIds { .. } => "get_functions_by_ids",
            BackendCall::GetMatchesForSmdaFunction(_) => "get_matches_for_smda_function",
            BackendCall::GetMatchesForPicHash { .. } => "get_matches_for_pichash",
            BackendCall::GetMatchesForPicBlockHash { .. } => "get_matches_for_picblockhash",
            BackendCall::GetQueueData(_) => "get_queue_data",
            BackendCall::GetJobData(_) => "get_job_data",
            BackendCall::GetResultForJob(_) => "get_result_for_job",
            BackendCall::GetResult(_) => "get_result",
            BackendCall::GetJobForResult(_) => "get_job_for_result",
            BackendCall::RequestMatchesForSample(_) => "request_matches_for_sample",
            BackendCall::RequestMatchesForSampleVs { .. } => "request_matches_for_sample_vs",
            BackendCall::GetMatchFunctionVs { .. } => "get_match_function_vs",
            BackendCall::RequestMatchesForMappedBinary { .. } => {
                "request_matches_for_mapped_binary"
            }
            BackendCall::RequestMatchesForUnmappedBinary { .. } => {
                "request_matches_for_unmapped_binary"
            }
        }
    }
}

/// Raw backend answer: status plus decoded payload
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub payload: Value,
}

impl BackendResponse {
    pub fn new(status: u16, payload: Value) -> Self {
        Self { status, payload }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Backend returned an undecodable payload: {0}")]
    InvalidPayload(String),
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn call(&self, call: BackendCall) -> Result<BackendResponse, BackendError>;
}
