use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "ingest.request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds, across both upsert endpoints.",
};

pub const RECORDS_UPSERTED: MetricDef = MetricDef {
    name: "ingest.records.upserted",
    metric_type: MetricType::Counter,
    description: "Airport records successfully upserted.",
};

pub const INGEST_FAILURES: MetricDef = MetricDef {
    name: "ingest.failures",
    metric_type: MetricType::Counter,
    description: "Requests terminated by a structure, validation, persistence or commit error.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, RECORDS_UPSERTED, INGEST_FAILURES];
