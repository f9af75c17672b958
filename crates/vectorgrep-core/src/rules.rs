//! 模式规则文件加载（TOML）
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::flags::{PatternFlags, CASELESS, DOTALL, MULTILINE, SINGLEMATCH};
use crate::pattern::Pattern;

/// 单条模式的配置（支持 pattern 或 regex 字段）
#[derive(Debug, Clone, Deserialize)]
struct PatternEntry {
    pub id: u32,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    /// 标志名列表：caseless / dotall / multiline / singlematch
    #[serde(default)]
    pub flags: Vec<String>,
}

/// 顶层规则文件结构
#[derive(Debug, Clone, Deserialize)]
struct PatternFile {
    #[serde(default)]
    pub patterns: Vec<PatternEntry>,
}

/// 从 TOML 文件加载模式集合（id 唯一性等校验留给 compile）
pub fn load_pattern_file(path: &Path) -> Result<Vec<Pattern>> {
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("read pattern file {}", path.display()))?;
    let parsed: PatternFile =
        toml::from_str(&txt).with_context(|| format!("parse pattern file {}", path.display()))?;
    let mut out = Vec::new();

    for e in parsed.patterns {
        // 兼容两种字段名：pattern 或 regex
        let text = match (e.pattern, e.regex) {
            (Some(p), _) => p,
            (None, Some(r)) => r,
            _ => bail!("pattern {} has neither `pattern` nor `regex`", e.id),
        };
        let mut flags = PatternFlags::empty();
        for name in &e.flags {
            flags |= parse_flag(name).with_context(|| format!("pattern {}", e.id))?;
        }
        out.push(Pattern::with_flags(text, e.id, flags));
    }

    Ok(out)
}

/// 标志名解析（小写）
fn parse_flag(name: &str) -> Result<PatternFlags> {
    Ok(match name {
        "caseless" => CASELESS,
        "dotall" => DOTALL,
        "multiline" => MULTILINE,
        "singlematch" => SINGLEMATCH,
        other => bail!("unknown flag `{other}`"),
    })
}
