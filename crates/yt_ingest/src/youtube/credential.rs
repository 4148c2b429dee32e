use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// 从密钥池中取出的一个 API 密钥，index 是它在池中的位置
#[derive(Clone)]
pub struct Credential {
    pub index: usize,
    key: Arc<str>,
}

impl Credential {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 日志中使用的 1 起始编号
    pub fn position(&self) -> usize {
        self.index + 1
    }
}

// 密钥不应该出现在任何日志中
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .field("key", &"***")
            .finish()
    }
}

struct KeyState {
    key: Arc<str>,
    failed: bool,
    usage_count: u64,
    last_success: Option<DateTime<Utc>>,
}

struct PoolState {
    keys: Vec<KeyState>,
    cursor: usize,
    last_successful: Option<usize>,
    anchor: NaiveDate,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuotaStatus {
    pub available_keys: usize,
    pub total_keys: usize,
    pub failed_keys: usize,
    /// 最近一次成功使用的密钥编号（1 起始），从未成功时为 None
    pub last_successful_key: Option<usize>,
    pub key_usage_stats: BTreeMap<String, u64>,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// 进程内唯一的密钥池，所有可变状态都位于同一把锁之后
pub struct CredentialPool {
    state: Mutex<PoolState>,
    reset_offset: FixedOffset,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>, reset_offset: FixedOffset) -> Self {
        let anchor = Utc::now().with_timezone(&reset_offset).date_naive();
        let keys = keys
            .into_iter()
            .map(|key| KeyState {
                key: Arc::from(key),
                failed: false,
                usage_count: 0,
                last_success: None,
            })
            .collect();
        Self {
            state: Mutex::new(PoolState {
                keys,
                cursor: 0,
                last_successful: None,
                anchor,
            }),
            reset_offset,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从游标处向后查找第一个未被标记失败的密钥，游标停在返回的密钥上
    pub fn next_available(&self) -> Option<Credential> {
        let mut state = self.state.lock();
        self.reset_if_new_day(&mut state);
        let len = state.keys.len();
        for _ in 0..len {
            let cursor = state.cursor;
            let key_state = &state.keys[cursor];
            if !key_state.failed {
                return Some(Credential {
                    index: cursor,
                    key: key_state.key.clone(),
                });
            }
            state.cursor = (cursor + 1) % len;
        }
        None
    }

    /// 将游标移到下一个密钥，执行器在一次尝试失败后调用
    pub fn rotate(&self) {
        let mut state = self.state.lock();
        let len = state.keys.len();
        if len > 0 {
            state.cursor = (state.cursor + 1) % len;
        }
    }

    pub fn mark_failed(&self, credential: &Credential) {
        let mut state = self.state.lock();
        if let Some(key_state) = state.keys.get_mut(credential.index) {
            key_state.failed = true;
        }
    }

    /// 成功会覆盖之前的失败标记，并计入使用次数
    pub fn mark_succeeded(&self, credential: &Credential) {
        let mut state = self.state.lock();
        if let Some(key_state) = state.keys.get_mut(credential.index) {
            key_state.failed = false;
            key_state.usage_count += 1;
            key_state.last_success = Some(Utc::now());
            state.last_successful = Some(credential.index);
        }
    }

    #[cfg(test)]
    pub fn is_failed(&self, index: usize) -> bool {
        self.state.lock().keys.get(index).is_some_and(|k| k.failed)
    }

    pub fn usage_count(&self, index: usize) -> u64 {
        self.state.lock().keys.get(index).map_or(0, |k| k.usage_count)
    }

    pub fn reset_all(&self) {
        let mut state = self.state.lock();
        Self::clear_failed(&mut state);
        info!("已重置全部 {} 个 API 密钥的失败标记", state.keys.len());
    }

    pub fn status(&self) -> QuotaStatus {
        let mut state = self.state.lock();
        self.reset_if_new_day(&mut state);
        let failed_keys = state.keys.iter().filter(|k| k.failed).count();
        QuotaStatus {
            available_keys: state.keys.len() - failed_keys,
            total_keys: state.keys.len(),
            failed_keys,
            last_successful_key: state.last_successful.map(|i| i + 1),
            key_usage_stats: state
                .keys
                .iter()
                .enumerate()
                .map(|(i, k)| (format!("Key_{}", i + 1), k.usage_count))
                .collect(),
            last_success_at: state.keys.iter().filter_map(|k| k.last_success).max(),
        }
    }

    /// 上游配额按天重置，跨过重置时刻后第一次访问密钥池时清空失败标记
    fn reset_if_new_day(&self, state: &mut PoolState) {
        let today = Utc::now().with_timezone(&self.reset_offset).date_naive();
        if state.anchor != today {
            Self::clear_failed(state);
            state.anchor = today;
            info!("配额重置时间已过，清空 API 密钥的失败标记");
        }
    }

    fn clear_failed(state: &mut PoolState) {
        for key_state in state.keys.iter_mut() {
            key_state.failed = false;
        }
    }

    #[cfg(test)]
    fn set_anchor(&self, anchor: NaiveDate) {
        self.state.lock().anchor = anchor;
    }
}
