use super::grammar::Captures;
use super::table::Endpoint;
use crate::backend::{BackendCall, BinaryMatchOptions, QueueQuery};
use crate::coercion::{Coerced, QueryExt};
use crate::error::AppError;
use bytes::Bytes;
use regex::bytes::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

static ID_LIST_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_id_list_regex() -> &'static Regex {
    ID_LIST_REGEX.get_or_init(|| {
        // One trailing newline is accepted
        Regex::new(r"^[0-9]+(?:[[:space:]]*,[[:space:]]*[0-9]+)*\n?$")
            .expect("Failed to compile id list regex")
    })
}

/// Methods the dispatcher serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        if *method == axum::http::Method::GET {
            Some(RequestMethod::Get)
        } else if *method == axum::http::Method::POST {
            Some(RequestMethod::Post)
        } else {
            None
        }
    }
}

/// The parts of a request an endpoint may read
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: RequestMethod,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

/// Comma separated ids; anything outside the grammar yields an empty list
pub fn parse_id_list(body: &[u8]) -> Coerced<Vec<u64>> {
    let parsed = if get_id_list_regex().is_match(body) {
        std::str::from_utf8(body).ok().and_then(|text| {
            text.split(',')
                .map(|id| id.trim().parse::<u64>().ok())
                .collect::<Option<Vec<_>>>()
        })
    } else {
        None
    };

    match parsed {
        Some(ids) => Coerced {
            value: ids,
            defaulted: false,
        },
        None => Coerced {
            value: Vec::new(),
            defaulted: true,
        },
    }
}

fn parse_document(body: &[u8]) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::MalformedDocument(e.to_string()))
}

fn required<T>(value: Option<T>, name: &'static str) -> Result<T, AppError> {
    value.ok_or(AppError::MissingCapture(name))
}

fn paging(query: &HashMap<String, String>) -> (u64, u64) {
    let start = query.uint_or("start", 0);
    let limit = query.uint_or("limit", 0);
    if start.defaulted || limit.defaulted {
        debug!(
            start = start.value,
            limit = limit.value,
            "Paging parameters defaulted"
        );
    }
    (start.value, limit.value)
}

fn binary_options(query: &HashMap<String, String>) -> BinaryMatchOptions {
    BinaryMatchOptions {
        minhash_threshold: query.numeric_or_absent("minhash_threshold").into_value(),
        pichash_size: query.numeric_or_absent("pichash_size").into_value(),
        band_matches_required: query.numeric_or_absent("band_matches_required").into_value(),
        // Server-side disassembly keeps mapped and unmapped matching distinguishable
        disassemble_locally: false,
        force_recalculation: query
            .stringified_bool_or("force_recalculation", false)
            .into_value(),
    }
}

impl Endpoint {
    /// Assemble the backend call for a request that matched this endpoint
    pub fn build_call(
        &self,
        request: &DispatchRequest,
        captures: &Captures,
    ) -> Result<BackendCall, AppError> {
        let query = &request.query;

        let call = match self {
            Endpoint::Status => BackendCall::GetStatus,
            Endpoint::SampleFunctions => {
                BackendCall::GetFunctionsBySampleId(required(captures.uint("id"), "id")?)
            }
            Endpoint::SampleById => BackendCall::GetSampleById(required(captures.uint("id"), "id")?),
            Endpoint::SampleBySha256 => {
                BackendCall::GetSampleBySha256(required(captures.owned("digest"), "digest")?)
            }
            Endpoint::Samples => match request.method {
                RequestMethod::Get => {
                    let (start, limit) = paging(query);
                    BackendCall::GetSamples { start, limit }
                }
                RequestMethod::Post => BackendCall::AddReport(parse_document(&request.body)?),
            },
            Endpoint::FamilyById => BackendCall::GetFamily {
                family_id: required(captures.uint("id"), "id")?,
                with_samples: query.flag("with_samples").value,
            },
            Endpoint::Families => BackendCall::GetFamilies,
            Endpoint::FunctionById => BackendCall::GetFunctionById {
                function_id: required(captures.uint("id"), "id")?,
                with_xcfg: query.flag("with_xcfg").value,
            },
            Endpoint::Functions => match request.method {
                RequestMethod::Get => {
                    let (start, limit) = paging(query);
                    BackendCall::GetFunctions { start, limit }
                }
                RequestMethod::Post => {
                    let ids = parse_id_list(&request.body);
                    if ids.defaulted {
                        debug!("Function id list did not parse, requesting none");
                    }
                    BackendCall::GetFunctionsByIds {
                        function_ids: ids.value,
                        with_label_only: query.flag("with_label_only").value,
                    }
                }
            },
            Endpoint::QueryFunction => {
                BackendCall::GetMatchesForSmdaFunction(parse_document(&request.body)?)
            }
            Endpoint::QueryPicHash => BackendCall::GetMatchesForPicHash {
                pichash: required(captures.hex("hash"), "hash")?,
                summary: captures.flag("summary"),
            },
            Endpoint::QueryPicBlockHash => BackendCall::GetMatchesForPicBlockHash {
                picblockhash: required(captures.hex("hash"), "hash")?,
                summary: captures.flag("summary"),
            },
            Endpoint::Jobs => {
                let (start, limit) = paging(query);
                BackendCall::GetQueueData(QueueQuery {
                    start,
                    limit,
                    method: query.string("method"),
                    filter: query.string("filter"),
                    state: query.string("state"),
                    ascending: query.stringified_bool_or("ascending", false).into_value(),
                })
            }
            Endpoint::JobById => {
                let job_id = required(captures.owned("id"), "id")?;
                if captures.flag("result") {
                    BackendCall::GetResultForJob(job_id)
                } else {
                    BackendCall::GetJobData(job_id)
                }
            }
            Endpoint::ResultById => {
                let result_id = required(captures.owned("id"), "id")?;
                if captures.flag("job") {
                    BackendCall::GetJobForResult(result_id)
                } else {
                    BackendCall::GetResult(result_id)
                }
            }
            Endpoint::MatchesSample => {
                let sample_id = required(captures.owned("id"), "id")?;
                match captures.owned("other_id") {
                    Some(other_sample_id) => BackendCall::RequestMatchesForSampleVs {
                        sample_id,
                        other_sample_id,
                    },
                    None => BackendCall::RequestMatchesForSample(sample_id),
                }
            }
            Endpoint::MatchesFunction => BackendCall::GetMatchFunctionVs {
                function_id: required(captures.owned("id"), "id")?,
                other_function_id: captures.owned("other_id"),
            },
            Endpoint::Version => BackendCall::GetVersion,
            Endpoint::QueryMappedBinary => BackendCall::RequestMatchesForMappedBinary {
                binary: request.body.clone(),
                base_address: required(captures.owned("base_addr"), "base_addr")?,
                options: binary_options(query),
            },
            Endpoint::QueryUnmappedBinary => BackendCall::RequestMatchesForUnmappedBinary {
                binary: request.body.clone(),
                options: binary_options(query),
            },
        };

        Ok(call)
    }
}
