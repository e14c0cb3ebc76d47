use super::speed_record::SpeedRecord;
use super::speed_test_config_key::SpeedTestConfigKey;

/// Last-write-wins storage of one [`SpeedRecord`] per configuration.
///
/// Implementations absorb their own I/O failures: a failed read looks like
/// a missing record and a failed write is dropped after logging.
pub trait SpeedRatioRepository: Send + Sync {
    fn get(&self, key: &SpeedTestConfigKey) -> Option<SpeedRecord>;
    fn put(&self, key: &SpeedTestConfigKey, record: SpeedRecord);
}
