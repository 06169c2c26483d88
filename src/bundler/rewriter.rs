//! 选择器宏重绑定
//! 单寄存器解释器：`#define <SELECTOR> x` 写入寄存器，`#undef <SELECTOR>` 清空寄存器，
//! 其余行中出现的选择器宏按记号边界替换为寄存器当前值

use std::borrow::Cow;

use crate::directive::{Directive, DirectiveGrammar};

/// 选择器宏改写器（每个产物一份）
#[derive(Debug, Clone)]
pub struct SelectorRewriter<'g> {
    grammar: &'g DirectiveGrammar,
    binding: Option<String>,
}

impl<'g> SelectorRewriter<'g> {
    pub fn new(grammar: &'g DirectiveGrammar) -> Self {
        Self {
            grammar,
            binding: None,
        }
    }

    /// 当前绑定值
    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    pub fn bind(&mut self, value: &str) {
        self.binding = Some(value.to_string());
    }

    pub fn unbind(&mut self) {
        self.binding = None;
    }

    /// 未绑定时原样返回
    pub fn substitute<'a>(&self, line: &'a str) -> Cow<'a, str> {
        match &self.binding {
            Some(value) => self.grammar.substitute_selector(line, value),
            None => Cow::Borrowed(line),
        }
    }

    /// 处理一行，返回应写入产物的行
    pub fn apply<'a>(&mut self, directive: &Directive<'_>, line: &'a str) -> Vec<Cow<'a, str>> {
        match directive {
            Directive::SelectorBind(value) => {
                self.bind(value);
                vec![
                    Cow::Owned(format!(
                        "// redefining {} to \"{}\"",
                        self.grammar.selector_macro(),
                        value
                    )),
                    Cow::Owned(format!("// {}", line)),
                ]
            }
            // 解绑只影响内部状态，不在产物中留下痕迹
            Directive::SelectorUnbind => {
                self.unbind();
                Vec::new()
            }
            _ => vec![self.substitute(line)],
        }
    }
}
