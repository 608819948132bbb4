/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `tasks`: task:{task_id} -> Task (JSON)
/// - `extensions`: ext:{identity} -> Extension (JSON)
/// - `settings`: setting:{name} -> value (JSON)

pub const TASK_PREFIX: &str = "task:";
pub const EXTENSION_PREFIX: &str = "ext:";
pub const SETTING_PREFIX: &str = "setting:";

/// Key under which the downloader store config lives in `settings`
pub const DOWNLOADER_CONFIG: &str = "downloader";

/// Encode a task key: task:{task_id}
pub fn encode_task_key(task_id: &str) -> Vec<u8> {
    format!("{TASK_PREFIX}{task_id}").into_bytes()
}

/// Decode a task key: task:{task_id} -> task_id
pub fn decode_task_key(key: &[u8]) -> Option<String> {
    decode_prefixed(key, TASK_PREFIX)
}

/// Encode an extension key: ext:{identity}
pub fn encode_extension_key(identity: &str) -> Vec<u8> {
    format!("{EXTENSION_PREFIX}{identity}").into_bytes()
}

/// Decode an extension key: ext:{identity} -> identity
pub fn decode_extension_key(key: &[u8]) -> Option<String> {
    decode_prefixed(key, EXTENSION_PREFIX)
}

/// Encode a setting key: setting:{name}
pub fn encode_setting_key(name: &str) -> Vec<u8> {
    format!("{SETTING_PREFIX}{name}").into_bytes()
}

fn decode_prefixed(key: &[u8], prefix: &str) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str
        .strip_prefix(prefix)
        .filter(|rest| !rest.is_empty())
        .map(String::from)
}
