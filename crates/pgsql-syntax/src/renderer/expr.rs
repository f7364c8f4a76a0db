use crate::{
    ast::expr::{BinaryOp, Expr, FunctionCall, Ident},
    renderer::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.add_param(val.clone()),
            Expr::Parameter(n) => {
                r.sql.push('$');
                r.sql.push_str(&n.to_string());
            }
            Expr::Number(text) => r.sql.push_str(text),
            Expr::StringLit(text) => {
                let quoted = r.dialect.quote_literal(text);
                r.sql.push_str(&quoted);
            }
            Expr::Literal(text) => r.sql.push_str(text),
            Expr::BinaryOp(op) => op.render(r),
            Expr::Not(inner) => {
                r.sql.push_str("NOT ");
                inner.render(r);
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                expr.render(r);
                r.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, elem) in list.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    elem.render(r);
                }
                r.sql.push(')');
            }
            Expr::IsNull { expr, negated } => {
                expr.render(r);
                r.sql
                    .push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::Exists(select) => {
                r.sql.push_str("EXISTS(");
                select.render(r);
                r.sql.push(')');
            }
            Expr::AnySubquery(select) => {
                r.sql.push_str("ANY(");
                select.render(r);
                r.sql.push(')');
            }
            Expr::Subquery(select) => {
                r.sql.push('(');
                select.render(r);
                r.sql.push(')');
            }
            Expr::FunctionCall(func) => func.render(r),
            Expr::Cast { expr, data_type } => {
                expr.render(r);
                r.sql.push_str("::");
                r.sql.push_str(data_type);
            }
            Expr::Nested(inner) => {
                r.sql.push('(');
                inner.render(r);
                r.sql.push(')');
            }
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                r.sql.push('.');
            }
            let quoted = r.dialect.quote_identifier(part);
            r.sql.push_str(&quoted);
        }
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        r.sql.push('(');
        self.left.render(r);
        r.sql.push(' ');
        r.sql.push_str(self.op.as_sql());
        r.sql.push(' ');
        self.right.render(r);
        r.sql.push(')');
    }
}

impl Render for FunctionCall {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&self.name);
        r.sql.push('(');
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            arg.render(r);
        }
        r.sql.push(')');
    }
}
