use proc_macro::TokenStream;

mod listener;
mod message;

/// 订阅者宏
/// - 为目标结构体/枚举实现 `::event_aggregator::Subscriber`，按声明顺序列出能力
/// - 参数：`#[listener(A, B, async(C, D))]`
///   - `A`、`B`：同步能力 `Listener<A>`、`Listener<B>`（可写 `dyn Loggable` 订阅日志旁路）
///   - `async(...)`：异步能力 `AsyncListener<C>`、`AsyncListener<D>`
/// - 无参数时生成不声明任何能力的实现（注册为空操作）
#[proc_macro_attribute]
pub fn listener(attr: TokenStream, item: TokenStream) -> TokenStream {
    listener::expand(attr, item)
}

/// 消息宏
/// - 为目标类型实现 `::event_aggregator::Message`
/// - 参数：`#[message(loggable)]` 声明可记录能力，要求目标类型实现 `Loggable`，
///   此时 `as_loggable` 返回 `Some(self)`
#[proc_macro_attribute]
pub fn message(attr: TokenStream, item: TokenStream) -> TokenStream {
    message::expand(attr, item)
}
