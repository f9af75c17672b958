//! 模式标志位（编译期逐模式生效）
use std::ops::{BitOr, BitOrAssign};

/// 单个模式的匹配标志集合
/// - 以位集表示，可用 `|` 组合；编译时逐模式应用，扫描期不可再改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PatternFlags(u32);

/// 大小写不敏感匹配
pub const CASELESS: PatternFlags = PatternFlags(1 << 0);
/// `.` 匹配换行
pub const DOTALL: PatternFlags = PatternFlags(1 << 1);
/// `^`/`$` 按行锚定
pub const MULTILINE: PatternFlags = PatternFlags(1 << 2);
/// 同一次扫描内该模式至多上报一次（保留首个命中）
pub const SINGLEMATCH: PatternFlags = PatternFlags(1 << 3);

impl PatternFlags {
    /// 空标志集
    pub const fn empty() -> Self {
        PatternFlags(0)
    }

    /// 是否包含给定标志（other 的所有位均置位）
    pub const fn contains(self, other: PatternFlags) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PatternFlags {
    type Output = PatternFlags;
    fn bitor(self, rhs: PatternFlags) -> PatternFlags {
        PatternFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PatternFlags {
    fn bitor_assign(&mut self, rhs: PatternFlags) {
        self.0 |= rhs.0;
    }
}
