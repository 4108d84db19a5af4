//! 分数百分比采样原语。
//!
//! # 设计总览（Why）
//! - 控制面以“整数分子 / 固定量级分母”表达注入概率，避免浮点舍入导致不同实现在边界值上判定不一致；
//! - 分母只允许百、万、百万三档，既能表达百万分之一的精度，又不会出现任意除数带来的歧义。
//!
//! # 契约说明（What）
//! - 分子为非负整数，允许超过分母：求值时截断为概率 1，而不是在构造期拒绝；
//! - 采样只比较整数：`draw < min(numerator, denominator)` 即命中。

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::draw::DrawSource;

/// 分母量级。
///
/// 序列化形态沿用 xDS 的 `HUNDRED` / `TEN_THOUSAND` / `MILLION` 拼写。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenominatorType {
    Hundred,
    TenThousand,
    Million,
}

impl DenominatorType {
    /// 返回分母的整数量级。
    pub const fn magnitude(self) -> u32 {
        match self {
            DenominatorType::Hundred => 100,
            DenominatorType::TenThousand => 10_000,
            DenominatorType::Million => 1_000_000,
        }
    }
}

/// 以 `numerator / denominator` 表达的采样概率。
///
/// # 教案式说明
/// - **意图 (Why)**：作为延迟与中止两类故障各自独立的闸门，保证跨实现“同一随机数得到同一结论”。
/// - **契约 (What)**：
///   - 值类型，构造后不可变，可自由复制；
///   - 分子超过分母时等价于必中，但 [`Self::numerator`] 仍返回原始值，便于审计下发内容；
///   - [`Self::sample`] 的输入必须位于 `[0, denominator)`，超出区间的值按“未命中”处理。
/// - **执行逻辑 (How)**：[`Self::effective_numerator`] 先截断到分母，再与抽样值做整数比较。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FractionalPercent {
    numerator: u32,
    denominator: DenominatorType,
}

impl FractionalPercent {
    /// 以显式分母量级构造。
    pub const fn new(numerator: u32, denominator: DenominatorType) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// 百分之 `numerator`。
    pub const fn per_hundred(numerator: u32) -> Self {
        Self::new(numerator, DenominatorType::Hundred)
    }

    /// 万分之 `numerator`。
    pub const fn per_ten_thousand(numerator: u32) -> Self {
        Self::new(numerator, DenominatorType::TenThousand)
    }

    /// 百万分之 `numerator`。
    pub const fn per_million(numerator: u32) -> Self {
        Self::new(numerator, DenominatorType::Million)
    }

    /// 控制面下发的原始分子。
    pub const fn numerator(&self) -> u32 {
        self.numerator
    }

    pub const fn denominator_type(&self) -> DenominatorType {
        self.denominator
    }

    /// 分母的整数值。
    pub const fn denominator(&self) -> u32 {
        self.denominator.magnitude()
    }

    /// 截断到分母后的分子，即 `[0, denominator)` 中会被判定为命中的抽样值个数。
    pub const fn effective_numerator(&self) -> u32 {
        let denominator = self.denominator();
        if self.numerator > denominator {
            denominator
        } else {
            self.numerator
        }
    }

    /// 分子为零时永不命中。
    pub const fn is_never(&self) -> bool {
        self.numerator == 0
    }

    /// 分子不小于分母时必中。
    pub const fn is_always(&self) -> bool {
        self.numerator >= self.denominator()
    }

    /// 以给定抽样值判定是否命中。
    ///
    /// `random_draw` 应取自 `[0, denominator)`；函数本身不会失败。
    pub const fn sample(&self, random_draw: u32) -> bool {
        random_draw < self.effective_numerator()
    }

    /// 从抽样源取一次值并判定。
    ///
    /// 每次调用恰好消耗一次抽样，调用方据此保证延迟与中止的抽样彼此独立。
    pub fn roll(&self, draws: &dyn DrawSource) -> bool {
        self.sample(draws.draw(self.denominator()))
    }
}

impl fmt::Display for FractionalPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator())
    }
}
