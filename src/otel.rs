// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Trace Context over AMQP Headers
//!
//! Publishers inject the current OpenTelemetry context into the message headers and
//! subscription loops extract it again, so a move, the war it triggers, and the log
//! entry written about that war end up on one trace.

use lapin::{
    protocol::basic::AMQPProperties,
    types::{AMQPValue, ShortString},
};
use opentelemetry::{
    global::{self, BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector},
    trace::{SpanKind, Tracer},
    Context,
};
use std::collections::BTreeMap;
use tracing::warn;

/// Name of the tracer used by subscription loops
pub(crate) const CONSUMER_TRACER: &str = "peril amqp consumer";

/// Reads and writes trace context entries as AMQP long-string headers.
pub(crate) struct AmqpHeaderPropagator<'a> {
    headers: &'a mut BTreeMap<ShortString, AMQPValue>,
}

impl<'a> AmqpHeaderPropagator<'a> {
    pub(crate) fn new(headers: &'a mut BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Injector for AmqpHeaderPropagator<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.headers.insert(
            ShortString::from(key.to_lowercase()),
            AMQPValue::LongString(value.into()),
        );
    }
}

impl Extractor for AmqpHeaderPropagator<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        match self.headers.get(key)? {
            AMQPValue::LongString(value) => std::str::from_utf8(value.as_bytes())
                .map_err(|err| warn!(error = err.to_string(), key, "trace header is not utf-8"))
                .ok(),
            _ => None,
        }
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|key| key.as_str()).collect()
    }
}

/// Writes `ctx` into a fresh header map using the global text map propagator.
pub(crate) fn inject_context(ctx: &Context) -> BTreeMap<ShortString, AMQPValue> {
    let mut headers = BTreeMap::default();

    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(ctx, &mut AmqpHeaderPropagator::new(&mut headers))
    });

    headers
}

/// Starts a consumer span for one delivery, parented on the context found in the
/// delivery headers (if any).
pub(crate) fn consumer_span(
    props: &AMQPProperties,
    tracer: &BoxedTracer,
    queue: &str,
) -> (Context, BoxedSpan) {
    let mut headers = props
        .headers()
        .as_ref()
        .map(|table| table.inner().clone())
        .unwrap_or_default();

    let ctx = global::get_text_map_propagator(|propagator| {
        propagator.extract(&AmqpHeaderPropagator::new(&mut headers))
    });

    let span = tracer
        .span_builder(format!("consume {queue}"))
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::types::LongString;

    #[test]
    fn injector_lowercases_keys() {
        let mut headers = BTreeMap::default();
        AmqpHeaderPropagator::new(&mut headers).set("TraceParent", "00-abc".to_owned());

        assert_eq!(
            headers.get(&ShortString::from("traceparent")),
            Some(&AMQPValue::LongString(LongString::from("00-abc")))
        );
    }

    #[test]
    fn extractor_ignores_non_string_headers() {
        let mut headers = BTreeMap::default();
        headers.insert(ShortString::from("count"), AMQPValue::LongInt(3));
        headers.insert(
            ShortString::from("traceparent"),
            AMQPValue::LongString(LongString::from("00-abc")),
        );

        let propagator = AmqpHeaderPropagator::new(&mut headers);
        assert_eq!(propagator.get("count"), None);
        assert_eq!(propagator.get("traceparent"), Some("00-abc"));
        assert_eq!(propagator.keys().len(), 2);
    }
}
