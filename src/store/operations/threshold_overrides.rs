use crate::detector::ThresholdOverrides;
use crate::store::keys;
use crate::store::{Store, StoreError};

impl Store {
    /// Persisted threshold overrides, or `None` on a fresh deployment.
    /// 反序列化失败按损坏记录处理：告警并回落到“无覆盖”，
    /// 坏记录不应让服务无法启动。
    pub fn get_threshold_overrides(&self) -> Result<Option<ThresholdOverrides>, StoreError> {
        let key = keys::threshold_overrides_key();
        match self.threshold_overrides.get(key.as_bytes())? {
            Some(raw) => match serde_json::from_slice::<ThresholdOverrides>(&raw) {
                Ok(overrides) => Ok(Some(overrides)),
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        "Failed to deserialize threshold overrides, ignoring the record"
                    );
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn save_threshold_overrides(
        &self,
        overrides: &ThresholdOverrides,
    ) -> Result<(), StoreError> {
        let key = keys::threshold_overrides_key();
        self.threshold_overrides
            .insert(key.as_bytes(), Self::serialize(overrides)?)?;
        Ok(())
    }

    pub fn clear_threshold_overrides(&self) -> Result<(), StoreError> {
        let key = keys::threshold_overrides_key();
        self.threshold_overrides.remove(key.as_bytes())?;
        Ok(())
    }
}
