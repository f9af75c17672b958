//! 扫描会话与回调协议
use regex_automata as ra;
use ra::Input;
use serde::Serialize;

use crate::error::{ScanError, RC_SCAN_TERMINATED, RC_SUCCESS};
use crate::matcher::{CompiledMatcher, Engine};

/// 单次命中事件；end 为开区间，偏移相对本次扫描缓冲区起点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchEvent {
    pub pattern_id: u32,
    pub start: usize,
    pub end: usize,
}

/// 回调返回值：继续扫描或立即停止
/// - Stop 是唯一的取消机制（协作式），本核心没有超时或外部取消令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAction {
    Continue,
    Stop,
}

/// 一次扫描的总体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// 完整跑完缓冲区
    Completed,
    /// 回调请求提前终止（非错误，照常返回给调用方）
    Terminated,
}

/// 扫描汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub status: ScanStatus,
    /// 实际上报给回调的命中数（SINGLEMATCH 抑制掉的不计）
    pub matches: usize,
}

impl ScanSummary {
    /// 对应的数值结果码
    pub fn code(&self) -> i32 {
        match self.status {
            ScanStatus::Completed => RC_SUCCESS,
            ScanStatus::Terminated => RC_SCAN_TERMINATED,
        }
    }

    pub fn terminated(&self) -> bool {
        self.status == ScanStatus::Terminated
    }
}

/// 单次扫描的可变状态；每次 scan 调用新建，扫描结束即销毁，
/// 只持有对匹配器的只读引用，绝不跨扫描保留命中状态
struct ScanContext<'m> {
    matcher: &'m CompiledMatcher,
    /// SINGLEMATCH 模式在本次扫描内是否已上报（按引擎内部下标）
    reported: Vec<bool>,
    matches: usize,
}

impl<'m> ScanContext<'m> {
    fn new(matcher: &'m CompiledMatcher) -> Self {
        Self {
            matcher,
            reported: vec![false; matcher.pattern_count()],
            matches: 0,
        }
    }

    /// 上报一个引擎命中；SINGLEMATCH 模式只放行首个
    fn report(
        &mut self,
        index: usize,
        start: usize,
        end: usize,
        on_match: &mut dyn FnMut(MatchEvent) -> ScanAction,
    ) -> ScanAction {
        if self.matcher.single[index] {
            if self.reported[index] {
                return ScanAction::Continue;
            }
            self.reported[index] = true;
        }
        self.matches += 1;
        on_match(MatchEvent { pattern_id: self.matcher.ids[index], start, end })
    }
}

/// 对单个缓冲区执行一趟同步扫描
/// - 空缓冲区直接返回 Completed / 0 命中，回调不会被调用
/// - 命中按引擎发现顺序在当前调用栈上同步回调；同一模式的 start 单调不减。
///   跨模式顺序属实现定义：两个引擎均为单趟最左匹配，重叠命中不会重复上报。
/// - 回调返回 Stop 时立即停止，状态为 Terminated，之后不再有任何回调
pub fn scan<F>(matcher: &CompiledMatcher, buffer: &[u8], mut on_match: F) -> Result<ScanSummary, ScanError>
where
    F: FnMut(MatchEvent) -> ScanAction,
{
    if buffer.is_empty() {
        return Ok(ScanSummary { status: ScanStatus::Completed, matches: 0 });
    }

    let mut ctx = ScanContext::new(matcher);
    let mut status = ScanStatus::Completed;

    match &matcher.engine {
        Engine::Literal(ac) => {
            for m in ac.find_iter(buffer) {
                if ctx.report(m.pattern().as_usize(), m.start(), m.end(), &mut on_match) == ScanAction::Stop {
                    status = ScanStatus::Terminated;
                    break;
                }
            }
        }
        Engine::Regex(re) => {
            for m in re.find_iter(Input::new(buffer)) {
                if ctx.report(m.pattern().as_usize(), m.start(), m.end(), &mut on_match) == ScanAction::Stop {
                    status = ScanStatus::Terminated;
                    break;
                }
            }
        }
    }

    Ok(ScanSummary { status, matches: ctx.matches })
}

/// 便捷封装：收集全部命中事件（不提前终止）
pub fn scan_collect(matcher: &CompiledMatcher, buffer: &[u8]) -> Result<Vec<MatchEvent>, ScanError> {
    let mut events = Vec::new();
    scan(matcher, buffer, |ev| {
        events.push(ev);
        ScanAction::Continue
    })?;
    Ok(events)
}
