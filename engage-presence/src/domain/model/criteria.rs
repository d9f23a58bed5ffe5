//! 查询条件（Criteria）
//!
//! 由 字段/操作符/值 叶子节点和 AND/OR 组合构成的小型谓词树。
//! 不支持原生查询的存储适配器在进程内求值（`Criteria::matches`），
//! 其余适配器可通过 `equals_value` 等方法翻译为索引查询。
//!
//! 集合字段（如连接的 roles、会话的 participants）上的 `Equals` / `In`
//! 判断的是成员关系，而不是整个集合相等。

use std::fmt::Debug;

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

/// 实体字段在求值时的取值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// 标量字段，`None` 表示未设置
    Scalar(Option<&'a str>),
    /// 集合字段
    Set(Vec<&'a str>),
}

/// 可被 `Criteria` 求值的实体
pub trait Filterable {
    type Field: Copy + PartialEq + Debug;

    fn field_value(&self, field: Self::Field) -> FieldValue<'_>;
}

/// 叶子条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter<F> {
    pub field: F,
    pub operator: Operator,
    pub values: Vec<String>,
}

impl<F> Filter<F> {
    fn evaluate(&self, value: FieldValue<'_>) -> bool {
        match value {
            FieldValue::Scalar(current) => match self.operator {
                Operator::Equals => match (current, self.values.first()) {
                    (Some(current), Some(expected)) => current == expected,
                    _ => false,
                },
                Operator::NotEquals => match (current, self.values.first()) {
                    (Some(current), Some(expected)) => current != expected,
                    (None, Some(_)) => true,
                    (_, None) => false,
                },
                Operator::In => current
                    .map(|c| self.values.iter().any(|v| v == c))
                    .unwrap_or(false),
                Operator::NotIn => current
                    .map(|c| self.values.iter().all(|v| v != c))
                    .unwrap_or(true),
                Operator::IsNull => current.is_none(),
                Operator::IsNotNull => current.is_some(),
            },
            FieldValue::Set(members) => {
                let contains = |v: &String| members.iter().any(|m| *m == v.as_str());
                match self.operator {
                    Operator::Equals => self.values.first().map(contains).unwrap_or(false),
                    Operator::NotEquals => !self.values.first().map(contains).unwrap_or(true),
                    Operator::In => self.values.iter().any(contains),
                    Operator::NotIn => !self.values.iter().any(contains),
                    Operator::IsNull => members.is_empty(),
                    Operator::IsNotNull => !members.is_empty(),
                }
            }
        }
    }
}

/// 谓词树
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria<F> {
    Filter(Filter<F>),
    And(Vec<Criteria<F>>),
    Or(Vec<Criteria<F>>),
}

impl<F: Copy + PartialEq + Debug> Criteria<F> {
    fn leaf(field: F, operator: Operator, values: Vec<String>) -> Self {
        Criteria::Filter(Filter {
            field,
            operator,
            values,
        })
    }

    pub fn equals(field: F, value: impl Into<String>) -> Self {
        Self::leaf(field, Operator::Equals, vec![value.into()])
    }

    pub fn not_equals(field: F, value: impl Into<String>) -> Self {
        Self::leaf(field, Operator::NotEquals, vec![value.into()])
    }

    pub fn is_in<I, S>(field: F, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::leaf(field, Operator::In, values.into_iter().map(Into::into).collect())
    }

    pub fn not_in<I, S>(field: F, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::leaf(
            field,
            Operator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn is_null(field: F) -> Self {
        Self::leaf(field, Operator::IsNull, Vec::new())
    }

    pub fn is_not_null(field: F) -> Self {
        Self::leaf(field, Operator::IsNotNull, Vec::new())
    }

    /// AND 组合（连续 and 会被展平为同一组）
    pub fn and(self, other: Criteria<F>) -> Self {
        match self {
            Criteria::And(mut group) => {
                group.push(other);
                Criteria::And(group)
            }
            first => Criteria::And(vec![first, other]),
        }
    }

    /// OR 组合（连续 or 会被展平为同一组）
    pub fn or(self, other: Criteria<F>) -> Self {
        match self {
            Criteria::Or(mut group) => {
                group.push(other);
                Criteria::Or(group)
            }
            first => Criteria::Or(vec![first, other]),
        }
    }

    /// 进程内求值。空 AND 恒真，空 OR 恒假
    pub fn matches<T>(&self, item: &T) -> bool
    where
        T: Filterable<Field = F>,
    {
        match self {
            Criteria::Filter(filter) => filter.evaluate(item.field_value(filter.field)),
            Criteria::And(group) => group.iter().all(|c| c.matches(item)),
            Criteria::Or(group) => group.iter().any(|c| c.matches(item)),
        }
    }

    /// 若条件（或顶层 AND 中的某个叶子）要求 `field == value`，返回该值
    ///
    /// 存储适配器用它把查询收敛到索引查找
    pub fn equals_value(&self, field: F) -> Option<&str> {
        match self {
            Criteria::Filter(filter)
                if filter.field == field && filter.operator == Operator::Equals =>
            {
                filter.values.first().map(String::as_str)
            }
            Criteria::And(group) => group.iter().find_map(|c| c.equals_value(field)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Field {
        Name,
        Nickname,
        Tags,
    }

    struct Item {
        name: String,
        nickname: Option<String>,
        tags: Vec<String>,
    }

    impl Filterable for Item {
        type Field = Field;

        fn field_value(&self, field: Field) -> FieldValue<'_> {
            match field {
                Field::Name => FieldValue::Scalar(Some(self.name.as_str())),
                Field::Nickname => FieldValue::Scalar(self.nickname.as_deref()),
                Field::Tags => FieldValue::Set(self.tags.iter().map(String::as_str).collect()),
            }
        }
    }

    fn item() -> Item {
        Item {
            name: "alice".into(),
            nickname: None,
            tags: vec!["commercial".into(), "admin".into()],
        }
    }

    #[test]
    fn test_scalar_operators() {
        let item = item();
        assert!(Criteria::equals(Field::Name, "alice").matches(&item));
        assert!(!Criteria::equals(Field::Name, "bob").matches(&item));
        assert!(Criteria::not_equals(Field::Name, "bob").matches(&item));
        assert!(Criteria::is_in(Field::Name, ["bob", "alice"]).matches(&item));
        assert!(Criteria::not_in(Field::Name, ["bob"]).matches(&item));
        assert!(Criteria::is_null(Field::Nickname).matches(&item));
        assert!(!Criteria::is_not_null(Field::Nickname).matches(&item));
        assert!(!Criteria::equals(Field::Nickname, "al").matches(&item));
    }

    #[test]
    fn test_set_operators_test_membership() {
        let item = item();
        assert!(Criteria::equals(Field::Tags, "commercial").matches(&item));
        assert!(!Criteria::equals(Field::Tags, "visitor").matches(&item));
        assert!(Criteria::is_in(Field::Tags, ["visitor", "admin"]).matches(&item));
        assert!(Criteria::not_equals(Field::Tags, "visitor").matches(&item));
        assert!(!Criteria::not_in(Field::Tags, ["admin"]).matches(&item));
        assert!(Criteria::is_not_null(Field::Tags).matches(&item));
    }

    #[test]
    fn test_groups() {
        let item = item();
        let both = Criteria::equals(Field::Name, "alice").and(Criteria::equals(Field::Tags, "admin"));
        assert!(both.matches(&item));

        let either = Criteria::equals(Field::Name, "bob").or(Criteria::is_null(Field::Nickname));
        assert!(either.matches(&item));

        assert!(Criteria::<Field>::And(vec![]).matches(&item));
        assert!(!Criteria::<Field>::Or(vec![]).matches(&item));
    }

    #[test]
    fn test_equals_value_extraction() {
        let criteria = Criteria::equals(Field::Tags, "commercial")
            .and(Criteria::equals(Field::Name, "alice"));
        assert_eq!(criteria.equals_value(Field::Name), Some("alice"));
        assert_eq!(criteria.equals_value(Field::Nickname), None);

        let either = Criteria::equals(Field::Name, "a").or(Criteria::equals(Field::Name, "b"));
        assert_eq!(either.equals_value(Field::Name), None);
    }
}
