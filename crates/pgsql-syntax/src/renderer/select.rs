use crate::{
    ast::{
        common::{JoinKind, OrderDir},
        select::Select,
    },
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("SELECT ");
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            column.render(r);
        }

        if let Some(from) = &self.from {
            r.sql.push_str(" FROM ");
            if let Some(schema) = &from.table.schema {
                let quoted = r.dialect.quote_identifier(schema);
                r.sql.push_str(&quoted);
                r.sql.push('.');
            }
            let quoted = r.dialect.quote_identifier(&from.table.name);
            r.sql.push_str(&quoted);
            if let Some(alias) = &from.alias {
                r.sql.push_str(" AS ");
                let quoted = r.dialect.quote_identifier(alias);
                r.sql.push_str(&quoted);
            }
        }

        for join in &self.joins {
            r.sql.push_str(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            if let Some(schema) = &join.table.schema {
                let quoted = r.dialect.quote_identifier(schema);
                r.sql.push_str(&quoted);
                r.sql.push('.');
            }
            let quoted = r.dialect.quote_identifier(&join.table.name);
            r.sql.push_str(&quoted);
            if let Some(alias) = &join.alias {
                r.sql.push_str(" AS ");
                let quoted = r.dialect.quote_identifier(alias);
                r.sql.push_str(&quoted);
            }
            r.sql.push_str(" ON ");
            join.on.render(r);
        }

        if let Some(where_clause) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            where_clause.render(r);
        }

        if !self.order_by.is_empty() {
            r.sql.push_str(" ORDER BY ");
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                item.expr.render(r);
                match item.direction {
                    Some(OrderDir::Asc) => r.sql.push_str(" ASC"),
                    Some(OrderDir::Desc) => r.sql.push_str(" DESC"),
                    None => {}
                }
            }
        }

        if let Some(limit) = &self.limit {
            r.sql.push_str(" LIMIT ");
            limit.render(r);
        }

        if let Some(offset) = &self.offset {
            r.sql.push_str(" OFFSET ");
            offset.render(r);
        }
    }
}
