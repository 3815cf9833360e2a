//! Condition tree → parameterized SQL
//!
//! Lowering runs in two passes. The first resolves every leaf, validates the
//! tree and collects the joins; the second renders the boolean expression.
//! Columns are qualified with their table whenever the first pass found a
//! join. Every operand is bound as a parameter; the only text taken from
//! the catalog verbatim is raw mapped expressions and explicit join
//! conditions.

use crate::config::TranslatorOptions;
use crate::dialect::{ArrayStyle, Dialect, InStyle, Pagination};
use crate::error::{Result, SqlError};
use crate::query::{CompiledQuery, JoinSpec};
use crate::render::{column_sql, escape_like, ParamAllocator, LIMIT_PARAM, OFFSET_PARAM};
use gatekeep_core::{
    ConditionGroup, ConditionLeaf, ConditionNode, CoreError, FieldResolver, GroupOperator,
    LikePattern, Operator, OperatorEntry, OperatorRegistry, ResolvedFieldAddress, SchemaCatalog, SqlShape,
    Value,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Select list and pagination for [`SqlTranslator::generate_select_query`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOptions {
    /// Field addresses to select; empty means `*`
    pub fields: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Dialect-aware translator
#[derive(Debug, Clone)]
pub struct SqlTranslator {
    dialect: Dialect,
    catalog: SchemaCatalog,
    registry: Cow<'static, OperatorRegistry>,
    options: TranslatorOptions,
}

/// Lowered WHERE expression with its bindings
#[derive(Debug, Clone)]
pub(crate) struct Lowered {
    pub(crate) where_sql: String,
    pub(crate) parameters: BTreeMap<String, Value>,
    pub(crate) joins: Vec<JoinSpec>,
    pub(crate) qualify: bool,
    pub(crate) select_list: String,
}

impl SqlTranslator {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            catalog: SchemaCatalog::default(),
            registry: Cow::Borrowed(OperatorRegistry::global()),
            options: TranslatorOptions::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = Cow::Owned(registry);
        self
    }

    pub fn with_options(mut self, options: TranslatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Lower a condition to a WHERE expression (without the `WHERE` keyword)
    pub fn translate(&self, condition: &ConditionNode, primary_root: &str) -> Result<CompiledQuery> {
        let lowered = self.lower(condition, primary_root, &[])?;
        Ok(CompiledQuery {
            sql_text: lowered.where_sql,
            parameters: lowered.parameters,
            joins: lowered.joins,
        })
    }

    /// `SELECT <fields> FROM <root> [joins] WHERE <expr> [pagination]`
    pub fn generate_select_query(
        &self,
        condition: &ConditionNode,
        primary_root: &str,
        options: &SelectOptions,
    ) -> Result<CompiledQuery> {
        let lowered = self.lower(condition, primary_root, &options.fields)?;
        let where_sql = lowered.where_sql.clone();
        self.assemble_select(primary_root, &lowered, where_sql, lowered.parameters.clone(), options)
    }

    /// `SELECT COUNT(*) FROM <root> [joins] WHERE <expr>`, never paginated
    pub fn generate_count_query(
        &self,
        condition: &ConditionNode,
        primary_root: &str,
    ) -> Result<CompiledQuery> {
        let lowered = self.lower(condition, primary_root, &[])?;
        let sql_text = format!(
            "SELECT COUNT(*) FROM {}{} WHERE {}",
            self.dialect.quote(primary_root)?,
            self.joins_sql(&lowered.joins)?,
            lowered.where_sql
        );
        tracing::debug!("count query for {}: {}", primary_root, sql_text);
        Ok(CompiledQuery {
            sql_text,
            parameters: lowered.parameters,
            joins: lowered.joins,
        })
    }

    pub(crate) fn lower(
        &self,
        condition: &ConditionNode,
        primary_root: &str,
        fields: &[String],
    ) -> Result<Lowered> {
        let mut lowering = Lowering::new(self, primary_root);
        lowering.prepare(condition)?;
        let mut resolved_fields = Vec::with_capacity(fields.len());
        for field in fields.iter().filter(|f| f.trim() != "*") {
            let resolved = lowering.resolve(field)?;
            lowering.add_join(&resolved);
            resolved_fields.push(resolved);
        }
        lowering.qualify = !lowering.joins.is_empty();

        let where_sql = lowering.render_node(condition)?;
        let select_list = if resolved_fields.is_empty() {
            if lowering.qualify {
                format!("{}.*", self.dialect.quote(primary_root)?)
            } else {
                "*".to_string()
            }
        } else {
            resolved_fields
                .iter()
                .map(|f| column_sql(self.dialect, f, lowering.qualify))
                .collect::<Result<Vec<_>>>()?
                .join(", ")
        };

        Ok(Lowered {
            where_sql,
            parameters: lowering.parameters,
            joins: lowering.joins,
            qualify: lowering.qualify,
            select_list,
        })
    }

    pub(crate) fn joins_sql(&self, joins: &[JoinSpec]) -> Result<String> {
        let mut sql = String::new();
        for join in joins {
            sql.push(' ');
            sql.push_str(&join.render(self.dialect)?);
        }
        Ok(sql)
    }

    pub(crate) fn assemble_select(
        &self,
        primary_root: &str,
        lowered: &Lowered,
        where_sql: String,
        mut parameters: BTreeMap<String, Value>,
        options: &SelectOptions,
    ) -> Result<CompiledQuery> {
        let mut sql_text = format!(
            "SELECT {} FROM {}{} WHERE {}",
            lowered.select_list,
            self.dialect.quote(primary_root)?,
            self.joins_sql(&lowered.joins)?,
            where_sql
        );

        let limit = self.dialect.placeholder(LIMIT_PARAM);
        let offset = self.dialect.placeholder(OFFSET_PARAM);
        match self.dialect.policy().pagination {
            Pagination::LimitOffset => {
                if let Some(value) = options.limit {
                    sql_text.push_str(&format!(" LIMIT {}", limit));
                    parameters.insert(LIMIT_PARAM.to_string(), Value::Number(value as f64));
                }
                if let Some(value) = options.offset {
                    sql_text.push_str(&format!(" OFFSET {}", offset));
                    parameters.insert(OFFSET_PARAM.to_string(), Value::Number(value as f64));
                }
            }
            Pagination::OffsetFetch => {
                if options.limit.is_some() || options.offset.is_some() {
                    sql_text.push_str(&format!(" ORDER BY (SELECT NULL) OFFSET {} ROWS", offset));
                    parameters.insert(
                        OFFSET_PARAM.to_string(),
                        Value::Number(options.offset.unwrap_or(0) as f64),
                    );
                }
                if let Some(value) = options.limit {
                    sql_text.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                    parameters.insert(LIMIT_PARAM.to_string(), Value::Number(value as f64));
                }
            }
        }

        tracing::debug!("select query for {}: {}", primary_root, sql_text);
        Ok(CompiledQuery {
            sql_text,
            parameters,
            joins: lowered.joins.clone(),
        })
    }
}

/// Lower a condition with the default catalog and options
pub fn translate(
    condition: &ConditionNode,
    dialect: Dialect,
    primary_root: &str,
) -> Result<CompiledQuery> {
    SqlTranslator::new(dialect).translate(condition, primary_root)
}

/// One lowering run: allocator, bindings and joins for a single statement
pub(crate) struct Lowering<'t> {
    translator: &'t SqlTranslator,
    resolver: FieldResolver<'t>,
    pub(crate) allocator: ParamAllocator,
    pub(crate) parameters: BTreeMap<String, Value>,
    pub(crate) joins: Vec<JoinSpec>,
    pub(crate) qualify: bool,
}

/// Array operator flavour
#[derive(Clone, Copy)]
enum ArrayOp {
    Contains,
    Overlap,
}

impl<'t> Lowering<'t> {
    pub(crate) fn new(translator: &'t SqlTranslator, primary_root: &str) -> Self {
        Self {
            translator,
            resolver: FieldResolver::new(&translator.catalog).with_primary_root(primary_root),
            allocator: ParamAllocator::new(translator.options.param_naming),
            parameters: BTreeMap::new(),
            joins: Vec::new(),
            qualify: false,
        }
    }

    fn dialect(&self) -> Dialect {
        self.translator.dialect
    }

    pub(crate) fn resolve(&self, address: &str) -> Result<ResolvedFieldAddress> {
        Ok(self.resolver.resolve(address, None)?)
    }

    fn entry(&self, operator: Operator) -> Result<&'t OperatorEntry> {
        let registry: &'t OperatorRegistry = &self.translator.registry;
        registry.get(operator).map_err(|e| match e {
            CoreError::UnsupportedOperator(operator) => SqlError::UnsupportedOperator {
                operator,
                dialect: self.dialect().to_string(),
            },
            other => other.into(),
        })
    }

    /// First pass: validate, resolve and collect joins
    pub(crate) fn prepare(&mut self, node: &ConditionNode) -> Result<()> {
        match node {
            ConditionNode::Leaf(leaf) => {
                self.entry(leaf.operator)?;
                leaf.validate()?;
                let resolved = self.resolve(&leaf.field_address)?;
                self.add_join(&resolved);
                Ok(())
            }
            ConditionNode::Group(group) => {
                if group.conditions.is_empty() {
                    return Err(SqlError::translation(format!(
                        "{} group has no conditions",
                        group.logical_operator.as_str()
                    )));
                }
                group.conditions.iter().try_for_each(|child| self.prepare(child))
            }
        }
    }

    /// Record the join for a crossing address, once per target table
    pub(crate) fn add_join(&mut self, resolved: &ResolvedFieldAddress) {
        let Some(relationship) = resolved.relationship.as_ref() else {
            return;
        };
        if self.joins.iter().any(|j| j.table == relationship.to) {
            return;
        }
        tracing::debug!(
            "join {} -> {} for '{}'",
            relationship.from,
            relationship.to,
            resolved.address
        );
        self.joins.push(JoinSpec::from_relationship(relationship));
    }

    /// Bind a value under a fresh name and return its placeholder
    pub(crate) fn bind(&mut self, hint: &str, value: Value) -> String {
        let name = self.allocator.next(hint);
        let placeholder = self.dialect().placeholder(&name);
        self.parameters.insert(name, value);
        placeholder
    }

    fn bind_indexed(&mut self, base: &str, value: Value) -> String {
        let name = self.allocator.indexed(base);
        let placeholder = self.dialect().placeholder(&name);
        self.parameters.insert(name, value);
        placeholder
    }

    fn column(&self, resolved: &ResolvedFieldAddress) -> Result<String> {
        column_sql(self.dialect(), resolved, self.qualify)
    }

    fn is_array_column(&self, resolved: &ResolvedFieldAddress) -> bool {
        resolved.raw_expression().is_none()
            && self
                .translator
                .catalog
                .is_array_column(&resolved.root_identifier, &resolved.effective_path().join("."))
    }

    pub(crate) fn render_node(&mut self, node: &ConditionNode) -> Result<String> {
        match node {
            ConditionNode::Leaf(leaf) => self.render_leaf(leaf),
            ConditionNode::Group(group) => self.render_group(group),
        }
    }

    fn render_group(&mut self, group: &ConditionGroup) -> Result<String> {
        if group.conditions.is_empty() {
            return Err(SqlError::translation(format!(
                "{} group has no conditions",
                group.logical_operator.as_str()
            )));
        }

        if let Some((resolved, values)) = self.collapsible(group)? {
            let column = self.column(&resolved)?;
            return self.render_in(&resolved, &column, values, false);
        }

        let mut parts = Vec::with_capacity(group.conditions.len());
        for child in &group.conditions {
            parts.push(self.render_node(child)?);
        }
        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        let keyword = format!(" {} ", group.logical_operator.sql_keyword());
        Ok(parts
            .iter()
            .map(|p| format!("({})", p))
            .collect::<Vec<_>>()
            .join(&keyword))
    }

    /// An `or` group of scalar `eq` leaves on one column, as that column and its values
    fn collapsible(
        &self,
        group: &ConditionGroup,
    ) -> Result<Option<(ResolvedFieldAddress, Vec<Value>)>> {
        if !self.translator.options.collapse_or_equality
            || group.logical_operator != GroupOperator::Or
            || group.conditions.len() < 2
        {
            return Ok(None);
        }

        let mut target: Option<ResolvedFieldAddress> = None;
        let mut values: Vec<Value> = Vec::new();
        for child in &group.conditions {
            let ConditionNode::Leaf(leaf) = child else {
                return Ok(None);
            };
            let value = match leaf.expected() {
                Some(value) if leaf.operator == Operator::Eq && value.is_scalar() => value,
                _ => return Ok(None),
            };
            let resolved = self.resolve(&leaf.field_address)?;
            match &target {
                Some(first)
                    if first.root_identifier != resolved.root_identifier
                        || first.effective_path() != resolved.effective_path()
                        || first.raw_expression() != resolved.raw_expression() =>
                {
                    return Ok(None)
                }
                Some(_) => {}
                None => target = Some(resolved),
            }
            if !values.contains(value) {
                values.push(value.clone());
            }
        }

        Ok(target.map(|resolved| (resolved, values)))
    }

    fn render_leaf(&mut self, leaf: &ConditionLeaf) -> Result<String> {
        let entry = self.entry(leaf.operator)?;
        let resolved = self.resolve(&leaf.field_address)?;
        let column = self.column(&resolved)?;
        let hint = resolved.effective_path().join("_");
        let value = leaf.expected();

        let sql = match entry.sql_shape_for(value) {
            SqlShape::Compare(symbol) => {
                let operand = single_value(leaf, value)?;
                let placeholder = self.bind(&hint, operand);
                format!("{} {} {}", column, symbol, placeholder)
            }
            SqlShape::IsNull => format!("{} IS NULL", column),
            SqlShape::IsNotNull => format!("{} IS NOT NULL", column),
            SqlShape::Like {
                pattern: LikePattern::Contains,
                negated,
            } if self.is_array_column(&resolved) => {
                let operand = single_value(leaf, value)?;
                let sql =
                    self.render_array(leaf, &column, &hint, ArrayOp::Contains, vec![operand])?;
                if negated {
                    format!("NOT ({})", sql)
                } else {
                    sql
                }
            }
            SqlShape::Like { pattern, negated } => {
                let text = like_text(leaf, value)?;
                let placeholder = self.bind(&hint, Value::String(pattern.wrap(&escape_like(&text))));
                format!(
                    "{} {}LIKE {}{}",
                    column,
                    if negated { "NOT " } else { "" },
                    placeholder,
                    self.dialect().like_escape_clause()
                )
            }
            SqlShape::In { negated } => {
                let values = list_values(leaf, value)?;
                self.render_in(&resolved, &column, values, negated)?
            }
            SqlShape::ArrayContains => {
                let operand = single_value(leaf, value)?;
                self.render_array(leaf, &column, &hint, ArrayOp::Contains, vec![operand])?
            }
            SqlShape::ArrayOverlap => {
                let values = list_values(leaf, value)?;
                self.render_array(leaf, &column, &hint, ArrayOp::Overlap, values)?
            }
        };
        Ok(sql)
    }

    fn render_in(
        &mut self,
        resolved: &ResolvedFieldAddress,
        column: &str,
        values: Vec<Value>,
        negated: bool,
    ) -> Result<String> {
        let keyword = if negated { "NOT IN" } else { "IN" };
        let hint = resolved.effective_path().join("_");
        match self.dialect().policy().in_style {
            InStyle::Tuple => {
                let placeholder = self.bind(&hint, Value::Array(values));
                Ok(format!("{} {} {}", column, keyword, placeholder))
            }
            InStyle::Distinct => {
                let base = format!("{}_in_stmt_generated", hint);
                let placeholders: Vec<String> = values
                    .into_iter()
                    .map(|v| self.bind_indexed(&base, v))
                    .collect();
                Ok(format!("{} {} ({})", column, keyword, placeholders.join(", ")))
            }
        }
    }

    fn render_array(
        &mut self,
        leaf: &ConditionLeaf,
        column: &str,
        hint: &str,
        op: ArrayOp,
        values: Vec<Value>,
    ) -> Result<String> {
        let style = self.dialect().policy().arrays;
        if style == ArrayStyle::Unsupported {
            return Err(SqlError::UnsupportedOperator {
                operator: leaf.operator.to_string(),
                dialect: self.dialect().to_string(),
            });
        }

        if style == ArrayStyle::PostgresArray {
            return Ok(match op {
                ArrayOp::Contains => {
                    let placeholder = self.bind(hint, values.into_iter().next().unwrap_or(Value::Null));
                    format!("{} @> ARRAY[{}]", column, placeholder)
                }
                ArrayOp::Overlap => {
                    let placeholder = self.bind(hint, Value::Array(values));
                    format!("{} && {}", column, placeholder)
                }
            });
        }

        let placeholders: Vec<String> = values.into_iter().map(|v| self.bind(hint, v)).collect();
        let list = placeholders.join(", ");
        Ok(match (style, op) {
            (ArrayStyle::MySqlJson, ArrayOp::Contains) => {
                format!("JSON_CONTAINS({}, JSON_ARRAY({}))", column, list)
            }
            (ArrayStyle::MySqlJson, ArrayOp::Overlap) => {
                format!("JSON_OVERLAPS({}, JSON_ARRAY({}))", column, list)
            }
            (ArrayStyle::BigQueryUnnest, ArrayOp::Contains) => format!(
                "EXISTS (SELECT 1 FROM UNNEST({}) AS elem WHERE elem = {})",
                column, list
            ),
            (ArrayStyle::BigQueryUnnest, ArrayOp::Overlap) => format!(
                "EXISTS (SELECT 1 FROM UNNEST({}) AS elem WHERE elem IN ({}))",
                column, list
            ),
            (ArrayStyle::SnowflakeArray, ArrayOp::Contains) => {
                format!("ARRAY_CONTAINS({}::VARIANT, {})", list, column)
            }
            (ArrayStyle::SnowflakeArray, ArrayOp::Overlap) => {
                format!("ARRAYS_OVERLAP({}, ARRAY_CONSTRUCT({}))", column, list)
            }
            (ArrayStyle::SqlServerOpenJson, ArrayOp::Contains) => format!(
                "EXISTS (SELECT 1 FROM OPENJSON({}) WHERE value = {})",
                column, list
            ),
            (ArrayStyle::SqlServerOpenJson, ArrayOp::Overlap) => format!(
                "EXISTS (SELECT 1 FROM OPENJSON({}) WHERE value IN ({}))",
                column, list
            ),
            (ArrayStyle::PostgresArray | ArrayStyle::Unsupported, _) => {
                return Err(SqlError::translation("unreachable array style"))
            }
        })
    }
}

fn missing_value(leaf: &ConditionLeaf) -> SqlError {
    SqlError::translation(format!("'{}' has no operand", leaf.describe()))
}

/// The scalar operand; a one-element list counts as its element
fn single_value(leaf: &ConditionLeaf, value: Option<&Value>) -> Result<Value> {
    match value {
        None | Some(Value::Null) => Err(missing_value(leaf)),
        Some(Value::Array(items)) if items.len() == 1 => Ok(items[0].clone()),
        Some(v) if v.is_scalar() => Ok(v.clone()),
        Some(v) => Err(SqlError::translation(format!(
            "'{}' needs a scalar operand, got {}",
            leaf.describe(),
            v.type_name()
        ))),
    }
}

fn list_values(leaf: &ConditionLeaf, value: Option<&Value>) -> Result<Vec<Value>> {
    match value {
        None | Some(Value::Null) => Err(missing_value(leaf)),
        Some(Value::Array(items)) if !items.is_empty() => Ok(items.clone()),
        Some(Value::Array(_)) => Err(SqlError::translation(format!(
            "'{}' has an empty list",
            leaf.field_address
        ))),
        Some(v) => Ok(vec![v.clone()]),
    }
}

fn like_text(leaf: &ConditionLeaf, value: Option<&Value>) -> Result<String> {
    let operand = single_value(leaf, value)?;
    operand.as_text().ok_or_else(|| {
        SqlError::translation(format!(
            "'{}' cannot match {} with LIKE",
            leaf.field_address,
            operand.type_name()
        ))
    })
}
