//! 算子定义
//!
//! 所有估计器只认这一个封闭枚举，按算子族集中分派。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::StatsError;

/// 选择性估计支持的算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Left,
    Right,
    OverLeft,
    OverRight,
    Before,
    After,
    OverBefore,
    OverAfter,
    Above,
    Below,
    OverAbove,
    OverBelow,
    Front,
    Back,
    OverFront,
    OverBack,
    Overlaps,
    Contains,
    Contained,
    Same,
    Adjacent,
}

/// 算子族，决定默认值和参与估计的维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorFamily {
    /// `<` `<=` `>` `>=`
    Comparison,
    /// 值维上的相对位置（left/right）
    ValuePosition,
    /// 时间维上的相对位置（before/after）
    TimePosition,
    /// 空间 Y/Z 轴上的相对位置（above/below/front/back）
    SpacePosition,
    Overlap,
    Containment,
    Same,
    Adjacent,
}

impl Operator {
    pub const ALL: [Operator; 25] = [
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Left,
        Operator::Right,
        Operator::OverLeft,
        Operator::OverRight,
        Operator::Before,
        Operator::After,
        Operator::OverBefore,
        Operator::OverAfter,
        Operator::Above,
        Operator::Below,
        Operator::OverAbove,
        Operator::OverBelow,
        Operator::Front,
        Operator::Back,
        Operator::OverFront,
        Operator::OverBack,
        Operator::Overlaps,
        Operator::Contains,
        Operator::Contained,
        Operator::Same,
        Operator::Adjacent,
    ];

    pub fn family(self) -> OperatorFamily {
        use Operator::*;
        match self {
            Lt | Le | Gt | Ge => OperatorFamily::Comparison,
            Left | Right | OverLeft | OverRight => OperatorFamily::ValuePosition,
            Before | After | OverBefore | OverAfter => OperatorFamily::TimePosition,
            Above | Below | OverAbove | OverBelow | Front | Back | OverFront | OverBack => {
                OperatorFamily::SpacePosition
            }
            Overlaps => OperatorFamily::Overlap,
            Contains | Contained => OperatorFamily::Containment,
            Same => OperatorFamily::Same,
            Adjacent => OperatorFamily::Adjacent,
        }
    }

    /// 交换两侧操作数后的等价算子，`a OP b` 等价于 `b OP' a`
    ///
    /// "over" 系列没有交换算子。
    pub fn commutator(self) -> Option<Operator> {
        use Operator::*;
        match self {
            Lt => Some(Gt),
            Gt => Some(Lt),
            Le => Some(Ge),
            Ge => Some(Le),
            Left => Some(Right),
            Right => Some(Left),
            Before => Some(After),
            After => Some(Before),
            Below => Some(Above),
            Above => Some(Below),
            Front => Some(Back),
            Back => Some(Front),
            Contains => Some(Contained),
            Contained => Some(Contains),
            Overlaps => Some(Overlaps),
            Same => Some(Same),
            Adjacent => Some(Adjacent),
            OverLeft | OverRight | OverBefore | OverAfter | OverAbove | OverBelow
            | OverFront | OverBack => None,
        }
    }

    /// 是否只依赖边界框相交关系
    pub fn is_bbox_op(self) -> bool {
        matches!(
            self,
            Operator::Overlaps | Operator::Contains | Operator::Contained | Operator::Same
        )
    }

    /// 空间位置算子（X/Y/Z 轴）
    pub fn is_space_position(self) -> bool {
        matches!(
            self,
            Operator::Left
                | Operator::Right
                | Operator::OverLeft
                | Operator::OverRight
                | Operator::Above
                | Operator::Below
                | Operator::OverAbove
                | Operator::OverBelow
                | Operator::Front
                | Operator::Back
                | Operator::OverFront
                | Operator::OverBack
        )
    }

    pub fn symbol(self) -> &'static str {
        use Operator::*;
        match self {
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Left => "<<",
            Right => ">>",
            OverLeft => "&<",
            OverRight => "&>",
            Before => "<<#",
            After => "#>>",
            OverBefore => "&<#",
            OverAfter => "#&>",
            Below => "<<|",
            Above => "|>>",
            OverBelow => "&<|",
            OverAbove => "|&>",
            Front => "<</",
            Back => "/>>",
            OverFront => "&</",
            OverBack => "/&>",
            Overlaps => "&&",
            Contains => "@>",
            Contained => "<@",
            Same => "~=",
            Adjacent => "-|-",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.symbol() == s.trim())
            .ok_or_else(|| StatsError::unsupported(s, "算子解析"))
    }
}
