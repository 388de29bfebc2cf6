//! Typed intermediate tree between the syntax forest and the bytecode
//! compiler.
//!
//! Lowering resolves the surface special forms: `if`, `lambda`, `define`
//! (including the function-definition sugar), and `import`. The root of
//! every lowered program is a single [`Ret`] wrapping the top-level
//! expressions; it is the only context in which `define` and `import` are
//! legal, which the compiler enforces.

use ahash::AHashSet;

use crate::{
    diagnostics::Diagnostics,
    error::{Error, ErrorKind, RunResult},
    parse::{Ast, Keyword, Leaf},
};

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Box<str>),
    Symbol(Box<str>),
}

/// One node of the intermediate tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Constant(Constant),
    /// A variable dereference, possibly module-qualified (`alias/name`).
    Deref(Box<str>),
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    If {
        pred: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
    Lambda {
        /// Display name; empty for anonymous lambdas.
        name: Box<str>,
        params: Vec<Box<str>>,
        body: Vec<Expr>,
    },
    Define {
        name: Box<str>,
        expr: Box<Expr>,
    },
    Import {
        path: Box<str>,
    },
}

/// The root of a lowered program: the top-level expressions in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ret {
    pub exprs: Vec<Expr>,
}

/// Lowers a parsed forest into the IR, recording failures in `diagnostics`.
pub(crate) fn build_ir(asts: &[Ast], diagnostics: &mut Diagnostics) -> RunResult<Ret> {
    let mut exprs = Vec::with_capacity(asts.len());
    for ast in asts {
        match lower(ast) {
            Ok(expr) => exprs.push(expr),
            Err(err) => {
                diagnostics.record(ErrorKind::SyntaxError, err.message());
                return Err(err);
            }
        }
    }
    Ok(Ret { exprs })
}

/// Collects the names bound by top-level `define` forms.
///
/// The compiler uses this set to classify free identifiers as module-local
/// before any of the defines have executed.
pub(crate) fn top_level_defines(ret: &Ret) -> AHashSet<Box<str>> {
    ret.exprs
        .iter()
        .filter_map(|expr| match expr {
            Expr::Define { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn lower(ast: &Ast) -> RunResult<Expr> {
    match ast {
        Ast::Leaf(leaf) => lower_leaf(leaf),
        Ast::Tree(children) => lower_tree(children),
    }
}

fn lower_leaf(leaf: &Leaf) -> RunResult<Expr> {
    Ok(match leaf {
        Leaf::Keyword(keyword) => {
            return Err(Error::syntax_error(format!(
                "keyword {keyword} must be the first element of an expression"
            )));
        }
        Leaf::Bool(b) => Expr::Constant(Constant::Bool(*b)),
        Leaf::Int(i) => Expr::Constant(Constant::Int(*i)),
        Leaf::Float(f) => Expr::Constant(Constant::Float(*f)),
        Leaf::Str(s) => Expr::Constant(Constant::Str(s.clone())),
        Leaf::Ident(name) => match name.strip_prefix('\'') {
            Some(symbol) => Expr::Constant(Constant::Symbol(symbol.into())),
            None => Expr::Deref(name.clone()),
        },
    })
}

fn lower_tree(children: &[Ast]) -> RunResult<Expr> {
    let Some(head) = children.first() else {
        return Err(Error::syntax_error("empty expression () cannot be evaluated"));
    };
    if let Ast::Leaf(Leaf::Keyword(keyword)) = head {
        return match keyword {
            Keyword::If => lower_if(&children[1..]),
            Keyword::Lambda => lower_lambda(&children[1..]),
            Keyword::Define => lower_define(&children[1..]),
            Keyword::Import => lower_import(&children[1..]),
        };
    }
    let func = lower(head)?;
    let args = children[1..].iter().map(lower).collect::<RunResult<Vec<_>>>()?;
    Ok(Expr::Call {
        func: Box::new(func),
        args,
    })
}

fn lower_if(rest: &[Ast]) -> RunResult<Expr> {
    let (pred, then, otherwise) = match rest {
        [pred, then] => (pred, then, None),
        [pred, then, otherwise] => (pred, then, Some(otherwise)),
        _ => {
            return Err(Error::syntax_error(format!(
                "if takes a predicate, a then branch, and an optional else branch, got {} forms",
                rest.len()
            )));
        }
    };
    Ok(Expr::If {
        pred: Box::new(lower(pred)?),
        then: Box::new(lower(then)?),
        otherwise: otherwise.map(|ast| lower(ast).map(Box::new)).transpose()?,
    })
}

fn lower_lambda(rest: &[Ast]) -> RunResult<Expr> {
    let [params, body @ ..] = rest else {
        return Err(Error::syntax_error("lambda requires a parameter list"));
    };
    lower_lambda_parts("", params, body)
}

/// Shared tail of `lambda` and the `(define (f ...) ...)` sugar.
fn lower_lambda_parts(name: &str, params: &Ast, body: &[Ast]) -> RunResult<Expr> {
    let Ast::Tree(param_asts) = params else {
        return Err(Error::syntax_error("lambda parameters must be a list of identifiers"));
    };
    let params = param_asts
        .iter()
        .map(|ast| match ast {
            Ast::Leaf(Leaf::Ident(name)) if !name.starts_with('\'') => Ok(name.clone()),
            _ => Err(Error::syntax_error("lambda parameters must be plain identifiers")),
        })
        .collect::<RunResult<Vec<_>>>()?;
    if body.is_empty() {
        return Err(Error::syntax_error("lambda body must contain at least one expression"));
    }
    Ok(Expr::Lambda {
        name: name.into(),
        params,
        body: body.iter().map(lower).collect::<RunResult<Vec<_>>>()?,
    })
}

fn lower_define(rest: &[Ast]) -> RunResult<Expr> {
    match rest {
        // (define name expr)
        [Ast::Leaf(Leaf::Ident(name)), expr] if !name.starts_with('\'') => Ok(Expr::Define {
            name: name.clone(),
            expr: Box::new(lower(expr)?),
        }),
        // (define (name params...) body...) => (define name (lambda (params...) body...))
        [Ast::Tree(signature), body @ ..] => {
            let [Ast::Leaf(Leaf::Ident(name)), params @ ..] = signature.as_slice() else {
                return Err(Error::syntax_error("define signature must start with a function name"));
            };
            if name.starts_with('\'') {
                return Err(Error::syntax_error("define signature must start with a function name"));
            }
            let lambda = lower_lambda_parts(name, &Ast::Tree(params.to_vec()), body)?;
            Ok(Expr::Define {
                name: name.clone(),
                expr: Box::new(lambda),
            })
        }
        _ => Err(Error::syntax_error(
            "define takes an identifier and an expression, or a signature and a body",
        )),
    }
}

fn lower_import(rest: &[Ast]) -> RunResult<Expr> {
    match rest {
        [Ast::Leaf(Leaf::Str(path))] => Ok(Expr::Import { path: path.clone() }),
        _ => Err(Error::syntax_error("import takes a single string path")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parse::parse;

    fn ir(source: &str) -> Ret {
        let mut diagnostics = Diagnostics::new();
        let asts = parse(source, &mut diagnostics).unwrap();
        build_ir(&asts, &mut diagnostics).unwrap()
    }

    fn ir_err(source: &str) -> Error {
        let mut diagnostics = Diagnostics::new();
        let asts = parse(source, &mut diagnostics).unwrap();
        build_ir(&asts, &mut diagnostics).unwrap_err()
    }

    #[test]
    fn test_symbol_literal_strips_apostrophe() {
        assert_eq!(
            ir("'sym").exprs,
            vec![Expr::Constant(Constant::Symbol("sym".into()))]
        );
    }

    #[test]
    fn test_call_lowering() {
        assert_eq!(
            ir("(f 1 x)").exprs,
            vec![Expr::Call {
                func: Box::new(Expr::Deref("f".into())),
                args: vec![Expr::Constant(Constant::Int(1)), Expr::Deref("x".into())],
            }]
        );
    }

    #[test]
    fn test_if_without_else() {
        assert_eq!(
            ir("(if true 1)").exprs,
            vec![Expr::If {
                pred: Box::new(Expr::Constant(Constant::Bool(true))),
                then: Box::new(Expr::Constant(Constant::Int(1))),
                otherwise: None,
            }]
        );
    }

    #[test]
    fn test_define_sugar_desugars_to_named_lambda() {
        let Expr::Define { name, expr } = ir("(define (add a b) (+ a b))").exprs.remove(0) else {
            panic!("expected define");
        };
        assert_eq!(&*name, "add");
        let Expr::Lambda { name, params, body } = *expr else {
            panic!("expected lambda");
        };
        assert_eq!(&*name, "add");
        assert_eq!(params, vec![Box::from("a"), Box::from("b")]);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_top_level_defines_collects_names() {
        let ret = ir("(define a 1) (a) (define b 2)");
        let defined = top_level_defines(&ret);
        assert!(defined.contains("a"));
        assert!(defined.contains("b"));
        assert_eq!(defined.len(), 2);
    }

    #[test]
    fn test_empty_lambda_body_is_rejected() {
        let err = ir_err("(lambda (x))");
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_bare_keyword_is_rejected() {
        assert_eq!(ir_err("define").kind(), ErrorKind::SyntaxError);
        assert_eq!(ir_err("(f if)").kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_empty_expression_is_rejected() {
        assert_eq!(ir_err("()").kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_import_requires_string_path() {
        assert_eq!(ir_err("(import foo)").kind(), ErrorKind::SyntaxError);
        assert!(matches!(
            ir(r#"(import "lib.fizz")"#).exprs.as_slice(),
            [Expr::Import { .. }]
        ));
    }
}
