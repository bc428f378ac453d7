use crate::{handle::kind, owner::ResourceOwner, types::PipelineStageFlags};

/// 在一个 [`CommandRecorder`](crate::commands::CommandRecorder) 中记录 GPU 时间戳
#[derive(Debug, Default, PartialEq)]
pub struct TimestampQueryRecorder {
    inner: ResourceOwner<kind::TimestampQueryRecorder>,
}

gpu_resource!(TimestampQueryRecorder => TimestampQueryRecorder);

impl TimestampQueryRecorder {
    pub(crate) fn new(inner: ResourceOwner<kind::TimestampQueryRecorder>) -> Self {
        Self { inner }
    }

    /// 返回这次写入的查询下标
    pub fn write_timestamp(&self, stage: PipelineStageFlags) -> Option<u32> {
        self.inner.write(|rm, timestamps| rm.write_timestamp(timestamps, stage)).flatten()
    }

    pub fn reset(&self) {
        self.inner.write(|rm, timestamps| rm.reset_timestamps(timestamps));
    }

    pub fn query_results(&self) -> Vec<u64> {
        self.inner.read(|rm, timestamps| rm.timestamp_results(timestamps)).unwrap_or_default()
    }

    pub fn timestamp_period(&self) -> f32 {
        self.inner.read(|rm, timestamps| rm.timestamp_period(timestamps)).unwrap_or(0.0)
    }

    /// 两次写入之间经过的纳秒数；下标越界时为 0
    pub fn ns_interval(&self, begin: u32, end: u32) -> u64 {
        let results = self.query_results();
        match (results.get(begin as usize), results.get(end as usize)) {
            (Some(begin), Some(end)) => ticks_to_ns(end.saturating_sub(*begin), self.timestamp_period()),
            _ => 0,
        }
    }
}

fn ticks_to_ns(ticks: u64, period: f32) -> u64 {
    (ticks as f64 * period as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_to_ns() {
        assert_eq!(ticks_to_ns(100, 1.0), 100);
        assert_eq!(ticks_to_ns(3, 83.333), 250);
        assert_eq!(ticks_to_ns(0, 52.08), 0);
    }

    #[test]
    fn test_default_recorder_is_inert() {
        let timestamps = TimestampQueryRecorder::default();
        assert!(!timestamps.is_valid());
        assert_eq!(timestamps.write_timestamp(PipelineStageFlags::TOP_OF_PIPE), None);
        assert!(timestamps.query_results().is_empty());
        assert_eq!(timestamps.ns_interval(0, 1), 0);
    }
}
