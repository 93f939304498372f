//! Relational renderer - transforms IR to SQL text
//!
//! Produces a single `SELECT` statement from a [`Query`]. Literals are inlined
//! by default; a parameterized renderer emits `?` placeholders and returns the
//! bound values alongside the text.

use nlq_ir::{
    AggFunc, CompareOp, Direction, JoinPlan, Literal, Predicate, PredicateValue, Projection,
    Query, Source, Target, WILDCARD,
};
use nlq_registry::{AggregateRegistry, RegistryError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Unsupported source for SQL: {0}")]
    UnsupportedSource(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<QueryParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&Literal> for QueryParam {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Int(i) => QueryParam::Int(*i),
            Literal::Float(x) => QueryParam::Float(*x),
            Literal::String(s) => QueryParam::String(s.clone()),
            Literal::Date(_) => QueryParam::String(literal.to_string()),
        }
    }
}

pub struct SqlRenderer {
    registry: AggregateRegistry,
    parameterize: bool,
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlRenderer {
    pub fn new() -> Self {
        Self {
            registry: AggregateRegistry::default(),
            parameterize: false,
        }
    }

    /// Bind literal values instead of inlining them
    pub fn parameterized(mut self, on: bool) -> Self {
        self.parameterize = on;
        self
    }

    /// Render a query to SQL
    pub fn render(&self, query: &Query) -> Result<CompiledQuery, RenderError> {
        let plan = match &query.source {
            Source::Relational { plan } => plan,
            Source::Collection { name } => {
                return Err(RenderError::UnsupportedSource(format!("collection {}", name)))
            }
        };

        let mut writer = Writer {
            registry: &self.registry,
            plan,
            query,
            parameterize: self.parameterize,
            params: Vec::new(),
        };

        let projection = query
            .projection
            .iter()
            .map(|p| writer.projection(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sql = format!("SELECT {} FROM {}", projection.join(","), from_clause(plan));

        let row: Vec<&Predicate> = query.row_predicates().collect();
        if !row.is_empty() {
            let conditions = row
                .into_iter()
                .map(|p| writer.predicate(p))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let keys: Vec<String> = query.group_by.iter().map(|c| writer.column(c)).collect();
            sql.push_str(&format!(" GROUP BY {}", keys.join(",")));
        }

        let aggregate: Vec<&Predicate> = query.aggregate_predicates().collect();
        if query.pattern.is_ranked() {
            if !aggregate.is_empty() {
                tracing::warn!(
                    count = aggregate.len(),
                    "aggregate filters ignored for ranked query"
                );
            }
        } else if !aggregate.is_empty() {
            let conditions = aggregate
                .into_iter()
                .map(|p| writer.predicate(p))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&format!(" HAVING {}", conditions.join(" AND ")));
        }

        if let Some(order) = &query.order {
            let keys = order
                .keys
                .iter()
                .map(|k| writer.sort_key(k))
                .collect::<Result<Vec<_>, _>>()?;
            let direction = match order.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY {} {}", keys.join(","), direction));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        tracing::debug!(%sql, params = writer.params.len(), "sql rendered");

        Ok(CompiledQuery {
            sql,
            params: writer.params,
        })
    }
}

/// `a JOIN b ON a.k = b.k JOIN ...`
fn from_clause(plan: &JoinPlan) -> String {
    match plan {
        JoinPlan::Single { table } => table.clone(),
        JoinPlan::Joined { base, links } => {
            let mut from = base.clone();
            for link in links {
                from.push_str(&format!(
                    " JOIN {right} ON {left}.{key} = {right}.{key}",
                    left = link.left,
                    right = link.right,
                    key = link.key
                ));
            }
            from
        }
    }
}

/// Per-render state: bound parameters accumulate here in text order
struct Writer<'a> {
    registry: &'a AggregateRegistry,
    plan: &'a JoinPlan,
    query: &'a Query,
    parameterize: bool,
    params: Vec<QueryParam>,
}

impl Writer<'_> {
    /// Column reference, qualified when it is a join key
    fn column(&self, name: &str) -> String {
        match self.plan.key_owner(name) {
            Some(table) => format!("{}.{}", table, name),
            None => name.to_string(),
        }
    }

    /// `Sum(amount)`, `Count(*)`
    fn aggregate(&self, func: AggFunc, field: &str) -> Result<String, RegistryError> {
        let sig = self.registry.lookup(func)?;
        let argument = if field == WILDCARD {
            WILDCARD.to_string()
        } else {
            self.column(field)
        };
        Ok(format!("{}({})", sig.sql_name, argument))
    }

    /// Capitalized alias: `Sum_amount`, `Count_all`
    fn alias(&self, func: AggFunc, field: &str) -> Result<String, RegistryError> {
        let sig = self.registry.lookup(func)?;
        let field = if field == WILDCARD { "all" } else { field };
        Ok(format!("{}_{}", sig.sql_name, field))
    }

    fn projection(&self, projection: &Projection) -> Result<String, RegistryError> {
        match projection.func {
            None if projection.is_wildcard() => Ok(WILDCARD.to_string()),
            None => Ok(self.column(&projection.field)),
            Some(func) => Ok(format!(
                "{} as {}",
                self.aggregate(func, &projection.field)?,
                self.alias(func, &projection.field)?
            )),
        }
    }

    fn target(&self, target: &Target) -> Result<String, RegistryError> {
        match target {
            Target::Column { name } => Ok(self.column(name)),
            Target::Aggregate { func, column } => self.aggregate(*func, column),
        }
    }

    /// Aggregate keys sort by their alias when it is projected
    fn sort_key(&self, key: &Target) -> Result<String, RegistryError> {
        match key {
            Target::Aggregate { func, column } => {
                let projected = key
                    .alias()
                    .is_some_and(|alias| self.query.projection_for_alias(&alias).is_some());
                if projected {
                    self.alias(*func, column)
                } else {
                    self.aggregate(*func, column)
                }
            }
            Target::Column { .. } => self.target(key),
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String, RegistryError> {
        let target = self.target(&predicate.target)?;
        let condition = match (&predicate.value, predicate.op) {
            (PredicateValue::Range { low, high }, _) => {
                let low = self.literal(low);
                let high = self.literal(high);
                format!("{} BETWEEN {} AND {}", target, low, high)
            }
            (PredicateValue::Scalar(value), CompareOp::Between) => {
                // A between without bounds degrades to equality.
                format!("{} = {}", target, self.literal(value))
            }
            (PredicateValue::Scalar(value), op) => {
                format!("{} {} {}", target, op.symbol(), self.literal(value))
            }
        };
        Ok(condition)
    }

    fn literal(&mut self, literal: &Literal) -> String {
        if self.parameterize {
            self.params.push(QueryParam::from(literal));
            return "?".to_string();
        }
        match literal {
            Literal::Int(_) | Literal::Float(_) => literal.to_string(),
            Literal::String(_) | Literal::Date(_) => format!("'{}'", literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlq_ir::{JoinLink, Ordering, Pattern};
    use pretty_assertions::assert_eq;

    fn sales(pattern: Pattern, projection: Vec<Projection>) -> Query {
        Query {
            pattern,
            projection,
            group_by: vec![],
            predicates: vec![],
            order: None,
            limit: None,
            offset: None,
            source: Source::Relational {
                plan: JoinPlan::Single { table: "sales".to_string() },
            },
        }
    }

    fn grouped_sum() -> Query {
        Query {
            group_by: vec!["region".to_string()],
            ..sales(
                Pattern::Aggregate { func: AggFunc::Sum, grouped: true },
                vec![Projection::column("region"), Projection::aggregate(AggFunc::Sum, "amount")],
            )
        }
    }

    fn render(query: &Query) -> String {
        SqlRenderer::new().render(query).unwrap().sql
    }

    #[test]
    fn test_grouped_sum() {
        assert_eq!(
            render(&grouped_sum()),
            "SELECT region,Sum(amount) as Sum_amount FROM sales GROUP BY region"
        );
    }

    #[test]
    fn test_full_clause_order() {
        let query = Query {
            predicates: vec![
                Predicate::compare(Target::column("year"), CompareOp::Eq, Literal::Int(2023)),
                Predicate::compare(
                    Target::column("region"),
                    CompareOp::Ne,
                    Literal::String("west".to_string()),
                ),
                Predicate::compare(
                    Target::aggregate(AggFunc::Sum, "amount"),
                    CompareOp::Gt,
                    Literal::Int(100),
                ),
            ],
            order: Some(Ordering {
                keys: vec![Target::aggregate(AggFunc::Sum, "amount")],
                direction: Direction::Desc,
            }),
            limit: Some(10),
            offset: Some(20),
            ..grouped_sum()
        };

        assert_eq!(
            render(&query),
            "SELECT region,Sum(amount) as Sum_amount FROM sales \
             WHERE year = 2023 AND region != 'west' \
             GROUP BY region \
             HAVING Sum(amount) > 100 \
             ORDER BY Sum_amount DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_count_all() {
        let query = sales(
            Pattern::Aggregate { func: AggFunc::Count, grouped: false },
            vec![Projection::aggregate(AggFunc::Count, "*")],
        );
        assert_eq!(render(&query), "SELECT Count(*) as Count_all FROM sales");
    }

    #[test]
    fn test_ranked_drops_having() {
        let query = Query {
            predicates: vec![
                Predicate::compare(Target::column("year"), CompareOp::Ge, Literal::Int(2020)),
                Predicate::compare(
                    Target::aggregate(AggFunc::Max, "amount"),
                    CompareOp::Gt,
                    Literal::Int(5),
                ),
            ],
            order: Some(Ordering {
                keys: vec![Target::column("amount")],
                direction: Direction::Desc,
            }),
            limit: Some(5),
            ..sales(
                Pattern::TopN,
                vec![Projection::column("product"), Projection::column("amount")],
            )
        };
        assert_eq!(
            render(&query),
            "SELECT product,amount FROM sales WHERE year >= 2020 ORDER BY amount DESC LIMIT 5"
        );
    }

    #[test]
    fn test_between_and_dates() {
        let date = |s: &str| Literal::Date(chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());
        let query = Query {
            predicates: vec![
                Predicate::between(Target::column("amount"), Literal::Int(10), Literal::Int(50)),
                Predicate::compare(Target::column("order_date"), CompareOp::Lt, date("2024-01-01")),
            ],
            ..sales(Pattern::Select, vec![Projection::wildcard()])
        };
        assert_eq!(
            render(&query),
            "SELECT * FROM sales WHERE amount BETWEEN 10 AND 50 AND order_date < '2024-01-01'"
        );
    }

    #[test]
    fn test_join_qualifies_keys() {
        let query = Query {
            source: Source::Relational {
                plan: JoinPlan::Joined {
                    base: "orders".to_string(),
                    links: vec![JoinLink {
                        left: "orders".to_string(),
                        right: "customers".to_string(),
                        key: "customer_id".to_string(),
                    }],
                },
            },
            group_by: vec!["customer_id".to_string()],
            ..sales(
                Pattern::Aggregate { func: AggFunc::Sum, grouped: true },
                vec![
                    Projection::column("customer_id"),
                    Projection::aggregate(AggFunc::Sum, "quantity"),
                ],
            )
        };
        assert_eq!(
            render(&query),
            "SELECT orders.customer_id,Sum(quantity) as Sum_quantity \
             FROM orders JOIN customers ON orders.customer_id = customers.customer_id \
             GROUP BY orders.customer_id"
        );
    }

    #[test]
    fn test_parameterized() {
        let query = Query {
            predicates: vec![
                Predicate::compare(
                    Target::column("region"),
                    CompareOp::Eq,
                    Literal::String("west".to_string()),
                ),
                Predicate::between(Target::column("amount"), Literal::Float(1.5), Literal::Int(9)),
            ],
            ..sales(Pattern::Select, vec![Projection::column("region")])
        };

        let compiled = SqlRenderer::new().parameterized(true).render(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT region FROM sales WHERE region = ? AND amount BETWEEN ? AND ?"
        );
        assert_eq!(
            compiled.params,
            vec![
                QueryParam::String("west".to_string()),
                QueryParam::Float(1.5),
                QueryParam::Int(9),
            ]
        );
    }

    #[test]
    fn test_collection_source_rejected() {
        let query = Query {
            source: Source::Collection { name: "sales".to_string() },
            ..grouped_sum()
        };
        assert!(matches!(
            SqlRenderer::new().render(&query),
            Err(RenderError::UnsupportedSource(_))
        ));
    }
}
