//! 模式编译与匹配器（字面量 AC 快路径 + meta 正则多模式引擎）
use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex_automata as ra;
use ra::meta;
use ra::util::syntax;

use crate::compat::check_compatibility;
use crate::error::ScanError;
use crate::flags::{PatternFlags, CASELESS, DOTALL, MULTILINE, SINGLEMATCH};
use crate::pattern::{validate_set, Pattern};

/// 底层匹配引擎
#[derive(Debug)]
pub(crate) enum Engine {
    /// 全字面量集合：Aho-Corasick 自动机
    Literal(AhoCorasick),
    /// 一般集合：regex-automata meta 多模式引擎（字节导向）
    Regex(meta::Regex),
}

/// 编译完成的多模式匹配器
/// - 构建后不可变，`Send + Sync`，可跨线程只读共享，每个线程各自驱动扫描调用
/// - 独占所有权句柄：不提供 Clone；Drop 时一次性释放底层自动机
#[derive(Debug)]
pub struct CompiledMatcher {
    pub(crate) engine: Engine,
    /// 引擎内部模式下标 -> 调用方指定的模式 id
    pub(crate) ids: Vec<u32>,
    /// 引擎内部模式下标 -> 是否 SINGLEMATCH
    pub(crate) single: Vec<bool>,
}

impl CompiledMatcher {
    /// 集合内模式数量
    pub fn pattern_count(&self) -> usize {
        self.ids.len()
    }
}

/// 将模式集合编译为可复用匹配器
/// - 集合为空、文本为空或 id 冲突 → InvalidInput
/// - 单条模式的语法/标志不被引擎接受 → Compilation（message 透传引擎原文，id 指向该条）
/// - 首次编译前隐式执行一次宿主能力检查
pub fn compile(patterns: &[Pattern]) -> Result<CompiledMatcher, ScanError> {
    check_compatibility()?;
    validate_set(patterns)?;

    let ids: Vec<u32> = patterns.iter().map(|p| p.id).collect();
    let single: Vec<bool> = patterns.iter().map(|p| p.flags.contains(SINGLEMATCH)).collect();

    let engine = if literal_set(patterns) {
        build_literal_engine(patterns)?
    } else {
        build_regex_engine(patterns)?
    };

    Ok(CompiledMatcher { engine, ids, single })
}

/// 集合能否走字面量快路径：
/// - 每条模式均不含正则元字符；
/// - 语法类标志只出现 CASELESS，且全集取值一致（AC 的大小写开关是全局的）。
fn literal_set(patterns: &[Pattern]) -> bool {
    let caseless = patterns[0].flags.contains(CASELESS);
    patterns.iter().all(|p| {
        is_plain_literal(&p.text)
            && !p.flags.contains(DOTALL)
            && !p.flags.contains(MULTILINE)
            && p.flags.contains(CASELESS) == caseless
    })
}

/// 是否纯字面量（不含任何正则元字符或转义）
fn is_plain_literal(text: &str) -> bool {
    !text.chars().any(|ch| {
        matches!(ch, '\\' | '[' | ']' | '{' | '}' | '(' | ')' | '?' | '*' | '+' | '|' | '^' | '$' | '.')
    })
}

fn build_literal_engine(patterns: &[Pattern]) -> Result<Engine, ScanError> {
    let caseless = patterns[0].flags.contains(CASELESS);
    let texts: Vec<&str> = patterns.iter().map(|p| p.text.as_str()).collect();
    let ac = AhoCorasickBuilder::new()
        .match_kind(aho_corasick::MatchKind::LeftmostLongest)
        .ascii_case_insensitive(caseless)
        .build(&texts)
        .map_err(|e| ScanError::Compilation { id: patterns[0].id, message: e.to_string() })?;
    Ok(Engine::Literal(ac))
}

fn build_regex_engine(patterns: &[Pattern]) -> Result<Engine, ScanError> {
    // 语法类标志以内联组形式逐条生效：(?ism:...)
    let decorated: Vec<String> = patterns.iter().map(|p| decorate(&p.text, p.flags)).collect();

    // 先逐条编译以定位出错模式，保证 Compilation 携带正确的 id
    for (text, p) in decorated.iter().zip(patterns.iter()) {
        if let Err(e) = builder().build(text) {
            return Err(ScanError::Compilation { id: p.id, message: e.to_string() });
        }
    }

    let refs: Vec<&str> = decorated.iter().map(|s| s.as_str()).collect();
    // 逐条均通过后整组编译理论上不再失败；保守起见仍显式传播
    let re = builder()
        .build_many(&refs)
        .map_err(|e| ScanError::InvalidInput(format!("pattern set rejected: {e}")))?;
    Ok(Engine::Regex(re))
}

/// 字节导向的 meta 构建器：允许在任意字节（含非 UTF-8）上匹配
fn builder() -> meta::Builder {
    let mut b = meta::Regex::builder();
    b.syntax(syntax::Config::new().utf8(false));
    b.configure(meta::Config::new().utf8_empty(false));
    b
}

/// 语法类标志转为内联组前缀
fn decorate(text: &str, flags: PatternFlags) -> String {
    let mut letters = String::new();
    if flags.contains(CASELESS) {
        letters.push('i');
    }
    if flags.contains(DOTALL) {
        letters.push('s');
    }
    if flags.contains(MULTILINE) {
        letters.push('m');
    }
    if letters.is_empty() {
        text.to_string()
    } else {
        format!("(?{letters}:{text})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags;
    use crate::scan::scan_collect;

    #[test]
    fn literal_sets_use_aho_corasick() {
        let m = compile(&[Pattern::new("foo", 1), Pattern::new("bar-baz_2", 2)]).unwrap();
        assert!(matches!(m.engine, Engine::Literal(_)));
        assert_eq!(m.pattern_count(), 2);
    }

    #[test]
    fn regex_sets_use_meta_engine() {
        let m = compile(&[Pattern::new("foo", 1), Pattern::new("ba+r", 2)]).unwrap();
        assert!(matches!(m.engine, Engine::Regex(_)));
    }

    #[test]
    fn mixed_caseless_literals_fall_back_to_regex() {
        let set = vec![
            Pattern::new("foo", 1),
            Pattern::with_flags("bar", 2, flags::CASELESS),
        ];
        let m = compile(&set).unwrap();
        assert!(matches!(m.engine, Engine::Regex(_)));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = compile(&[Pattern::new("a", 1), Pattern::new("b", 1)]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn empty_set_rejected() {
        let err = compile(&[]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn bad_syntax_reports_offending_id() {
        let set = vec![Pattern::new("ok", 1), Pattern::new("(unclosed", 9)];
        match compile(&set).unwrap_err() {
            ScanError::Compilation { id, message } => {
                assert_eq!(id, 9);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn multiline_flag_anchors_per_line() {
        let m = compile(&[Pattern::with_flags("^bar", 1, flags::MULTILINE)]).unwrap();
        let events = scan_collect(&m, b"foo\nbar\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].start, events[0].end), (4, 7));
    }

    #[test]
    fn dotall_flag_crosses_newlines() {
        let m = compile(&[Pattern::with_flags("a.b", 1, flags::DOTALL)]).unwrap();
        assert_eq!(scan_collect(&m, b"a\nb").unwrap().len(), 1);
        let m = compile(&[Pattern::new("a.b", 1)]).unwrap();
        assert!(scan_collect(&m, b"a\nb").unwrap().is_empty());
    }

    #[test]
    fn matches_raw_non_utf8_bytes() {
        let m = compile(&[Pattern::new("se.ret", 1)]).unwrap();
        let buf = [0xff, 0xfe, b's', b'e', b'c', b'r', b'e', b't', 0xff];
        let events = scan_collect(&m, &buf).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].start, events[0].end), (2, 8));
    }
}
