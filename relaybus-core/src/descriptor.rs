//! 事件静态分类（Descriptor）
//!
//! 每个事件类型在定义时声明一次分类（`Category`）与优先级（`Priority`），
//! 不可变、与事件值无关。引擎据此决定路由通道与队列内排序。
//!
use serde::{Deserialize, Serialize};

/// 事件分类：决定事件进入哪条队列与哪条投递通道
///
/// 非 UI 分类走后台通道，`Ui` 走串行化的 UI 亲和通道。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// 不属于其他分类的通用事件
    Generic,
    /// 数据请求或数据传递类事件
    Data,
    /// 网络请求类事件
    Network,
    /// 上下文请求类事件
    Context,
    /// 界面类事件
    Ui,
}

impl Category {
    /// 分类总数，用于定长队列数组的下标空间
    pub const COUNT: usize = 5;

    /// 后台轮询的固定检查次序（不含 `Ui`）
    pub const BACKGROUND_PRECEDENCE: [Category; 4] = [
        Category::Network,
        Category::Data,
        Category::Generic,
        Category::Context,
    ];

    /// 返回该分类在队列数组中的下标
    pub const fn index(self) -> usize {
        match self {
            Category::Generic => 0,
            Category::Data => 1,
            Category::Network => 2,
            Category::Context => 3,
            Category::Ui => 4,
        }
    }

    /// 是否路由至 UI 亲和通道
    pub const fn is_ui(self) -> bool {
        matches!(self, Category::Ui)
    }
}

/// 事件优先级：同一分类队列内的出队次序
///
/// 变体按升序声明，派生的 `Ord` 与数值级别一致：
/// `Critical(5) > High(4) > Normal(3) > Low(2) > Irrelevant(1)`。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Priority {
    /// 可有可无，处理与否无关紧要
    Irrelevant = 1,
    /// 允许延后处理
    Low = 2,
    /// 常规处理
    #[default]
    Normal = 3,
    /// 应尽快处理
    High = 4,
    /// 必须立即处理
    Critical = 5,
}

impl Priority {
    /// 数值级别（1..=5）
    pub const fn level(self) -> u8 {
        self as u8
    }
}

/// 事件描述符：分类 + 优先级，附着在事件类型上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub category: Category,
    pub priority: Priority,
}

impl Descriptor {
    pub const fn new(category: Category, priority: Priority) -> Self {
        Self { category, priority }
    }
}

/// 可路由事件：在类型定义处声明一次描述符
///
/// 描述符来自类型而非值，注册后即不可变。未实现该 trait 的值
/// 只能以不可分类（opaque）方式投递，最终进入未路由事件收集器。
pub trait RoutedEvent: Send + Sync + 'static {
    const DESCRIPTOR: Descriptor;
}
