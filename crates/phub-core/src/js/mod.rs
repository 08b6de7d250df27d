//! Minimal evaluator for the obfuscated script fragments served by the site
//!
//! Pages carry two kinds of script that have to be run to get at the data:
//! the decoration script that patches the flash object, and the renewal
//! challenge. Both only ever assign to variables and properties, so instead
//! of embedding a script engine this module tokenizes, parses into a small
//! AST and walks it. Nothing here can call functions or touch the host.

mod eval;
mod lexer;
mod parser;

pub use eval::{Env, number, to_number};
pub use lexer::{Token, tokenize};
pub use parser::{Program, parse};

use crate::error::Result;

/// Tokenizes and parses `src`
pub fn compile(src: &str) -> Result<Program> {
    parse(&tokenize(src)?)
}

/// Tokenizes and parses `src`, renaming identifier `from` to `to`
///
/// Renaming happens on identifier tokens, so string literals and longer
/// names sharing the prefix are left alone.
pub fn compile_renamed(src: &str, from: &str, to: &str) -> Result<Program> {
    let mut tokens = tokenize(src)?;
    for token in &mut tokens {
        if let Token::Ident(name) = token
            && *name == from
        {
            *name = to.to_string();
        }
    }
    parse(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_renamed_only_touches_identifiers() {
        let program =
            compile_renamed("flashvars_1.a = 'flashvars_1'; flashvars_12 = 3;", "flashvars_1", "FLASH")
                .unwrap();
        let mut env = Env::new()
            .with("FLASH", json!({}))
            .with("flashvars_12", json!(0));
        env.run(&program).unwrap();
        assert_eq!(env.get("FLASH"), Some(&json!({"a": "flashvars_1"})));
        assert_eq!(env.get("flashvars_12"), Some(&json!(3)));
    }
}
