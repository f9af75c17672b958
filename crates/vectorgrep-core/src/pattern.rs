//! 模式定义与集合校验
use std::collections::HashSet;

use crate::error::ScanError;
use crate::flags::PatternFlags;

/// 单条扫描模式（字面量或正则），提交编译后不可变
#[derive(Debug, Clone)]
pub struct Pattern {
    /// 模式文本（正则方言；纯字面量也走同一入口）
    pub text: String,
    /// 集合内唯一的模式 id，命中事件原样回传
    pub id: u32,
    /// 匹配标志
    pub flags: PatternFlags,
}

impl Pattern {
    /// 无标志模式
    pub fn new(text: impl Into<String>, id: u32) -> Self {
        Self { text: text.into(), id, flags: PatternFlags::empty() }
    }

    /// 带标志模式
    pub fn with_flags(text: impl Into<String>, id: u32, flags: PatternFlags) -> Self {
        Self { text: text.into(), id, flags }
    }
}

/// 校验模式集合：非空、每条文本非空、id 不冲突
/// - 报错信息携带出错的 id，便于调用方定位
pub(crate) fn validate_set(patterns: &[Pattern]) -> Result<(), ScanError> {
    if patterns.is_empty() {
        return Err(ScanError::InvalidInput("empty pattern set".into()));
    }
    let mut seen: HashSet<u32> = HashSet::with_capacity(patterns.len());
    for p in patterns {
        if p.text.is_empty() {
            return Err(ScanError::InvalidInput(format!("pattern {} has empty text", p.id)));
        }
        if !seen.insert(p.id) {
            return Err(ScanError::InvalidInput(format!("duplicate pattern id {}", p.id)));
        }
    }
    Ok(())
}
