//! Process statistics / 进程指标
//!
//! Bridges `prometheus`'s `/proc` based process collector into the
//! OpenMetrics registry, re-encoding its families on every scrape.

use prometheus::core::Collector as _;
use prometheus::process_collector::ProcessCollector;
use prometheus::proto::MetricType;
use prometheus_client::collector::Collector;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::gauge::ConstGauge;
use std::fmt;

/// CPU time, memory, open fds and threads of this process / 本进程资源使用
pub(crate) struct ProcessStats {
    inner: ProcessCollector,
}

impl ProcessStats {
    pub fn for_self() -> Self {
        Self {
            inner: ProcessCollector::for_self(),
        }
    }
}

impl fmt::Debug for ProcessStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessStats").finish_non_exhaustive()
    }
}

impl Collector for ProcessStats {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        for family in self.inner.collect() {
            let Some(metric) = family.get_metric().first() else {
                continue;
            };

            match family.get_field_type() {
                MetricType::COUNTER => {
                    // The OpenMetrics encoder appends the suffix itself
                    let name = family.get_name();
                    let name = name.strip_suffix("_total").unwrap_or(name);
                    let counter = ConstCounter::new(metric.get_counter().get_value());
                    let metric_encoder = encoder.encode_descriptor(
                        name,
                        family.get_help(),
                        None,
                        counter.metric_type(),
                    )?;
                    counter.encode(metric_encoder)?;
                }
                MetricType::GAUGE => {
                    let gauge = ConstGauge::new(metric.get_gauge().get_value());
                    let metric_encoder = encoder.encode_descriptor(
                        family.get_name(),
                        family.get_help(),
                        None,
                        gauge.metric_type(),
                    )?;
                    gauge.encode(metric_encoder)?;
                }
                _ => {}
            }
        }

        Ok(())
    }
}
