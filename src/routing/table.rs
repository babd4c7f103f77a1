use super::grammar::{Captures, Grammar, GrammarError};

/// What a matched rule does with the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Status,
    SampleFunctions,
    SampleById,
    SampleBySha256,
    Samples,
    FamilyById,
    Families,
    FunctionById,
    Functions,
    QueryFunction,
    QueryPicHash,
    QueryPicBlockHash,
    Jobs,
    JobById,
    ResultById,
    MatchesSample,
    MatchesFunction,
    Version,
    QueryMappedBinary,
    QueryUnmappedBinary,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Status => "status",
            Endpoint::SampleFunctions => "sample_functions",
            Endpoint::SampleById => "sample_by_id",
            Endpoint::SampleBySha256 => "sample_by_sha256",
            Endpoint::Samples => "samples",
            Endpoint::FamilyById => "family_by_id",
            Endpoint::Families => "families",
            Endpoint::FunctionById => "function_by_id",
            Endpoint::Functions => "functions",
            Endpoint::QueryFunction => "query_function",
            Endpoint::QueryPicHash => "query_pichash",
            Endpoint::QueryPicBlockHash => "query_picblockhash",
            Endpoint::Jobs => "jobs",
            Endpoint::JobById => "job",
            Endpoint::ResultById => "result",
            Endpoint::MatchesSample => "matches_sample",
            Endpoint::MatchesFunction => "matches_function",
            Endpoint::Version => "version",
            Endpoint::QueryMappedBinary => "query_mapped_binary",
            Endpoint::QueryUnmappedBinary => "query_unmapped_binary",
        }
    }
}

/// The API's rules, in evaluation order. Earlier rules shadow later ones.
pub const API_RULES: &[(&str, Endpoint)] = &[
    ("status", Endpoint::Status),
    ("samples/{id:uint}/functions", Endpoint::SampleFunctions),
    ("samples/{id:uint}", Endpoint::SampleById),
    ("samples/sha256/{digest:sha256}", Endpoint::SampleBySha256),
    ("samples", Endpoint::Samples),
    ("families/{id:uint}", Endpoint::FamilyById),
    ("families", Endpoint::Families),
    ("functions/{id:uint}", Endpoint::FunctionById),
    ("functions", Endpoint::Functions),
    ("query/function", Endpoint::QueryFunction),
    ("query/pichash/{hash:hex16}[/summary]", Endpoint::QueryPicHash),
    ("query/picblockhash/{hash:hex16}[/summary]", Endpoint::QueryPicBlockHash),
    ("jobs", Endpoint::Jobs),
    ("jobs/{id:hex}[/result]", Endpoint::JobById),
    ("results/{id:hex}[/job]", Endpoint::ResultById),
    ("matches/sample/{id:digits}[/{other_id:digits}]", Endpoint::MatchesSample),
    ("matches/function/{id:digits}[/{other_id:digits}]", Endpoint::MatchesFunction),
    ("version", Endpoint::Version),
    ("query/binary/mapped/{base_addr:digits}", Endpoint::QueryMappedBinary),
    ("query/binary", Endpoint::QueryUnmappedBinary),
];

/// A grammar bound to an endpoint
#[derive(Debug, Clone)]
pub struct Rule {
    grammar: Grammar,
    endpoint: Endpoint,
}

impl Rule {
    pub fn new(pattern: &str, endpoint: Endpoint) -> Result<Self, GrammarError> {
        Ok(Self {
            grammar: Grammar::parse(pattern)?,
            endpoint,
        })
    }

    pub fn pattern(&self) -> &str {
        self.grammar.pattern()
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}

/// Ordered rule list, built once at startup
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<Rule>,
}

impl RouteTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn from_patterns(patterns: &[(&str, Endpoint)]) -> Result<Self, GrammarError> {
        let rules = patterns
            .iter()
            .map(|(pattern, endpoint)| Rule::new(pattern, *endpoint))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Table serving `/api/`
    pub fn api() -> Result<Self, GrammarError> {
        Self::from_patterns(API_RULES)
    }

    /// First rule whose grammar matches the whole path
    pub fn resolve(&self, path: &str) -> Option<(&Rule, Captures)> {
        self.rules
            .iter()
            .find_map(|rule| rule.grammar.captures(path).map(|captures| (rule, captures)))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
