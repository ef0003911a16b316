//! Domain records shared by the store, the services and the HTTP layer.

use serde::Serialize;

/// Declares a closed set of lower-case string values persisted as `TEXT`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text $(, alias = $alias)*)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::utils::error::AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    other => Err(crate::utils::error::AppError::Internal(format!(
                        "unknown {} value '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub mod event;
pub mod notification;
pub mod ticket;
pub mod transaction;
pub mod user;

/// One page of a filtered listing together with the unpaged total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            total / limit + i64::from(total % limit != 0)
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::PaymentMethod;

    #[test]
    fn test_pagination_rounds_pages_up() {
        let p = Pagination::new(1, 10, 21);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(!p.has_prev);

        let last = Pagination::new(3, 10, 21);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn test_text_enum_accepts_aliases() {
        assert_eq!(
            "mpesa".parse::<PaymentMethod>().ok(),
            Some(PaymentMethod::MobileMoney)
        );
        assert_eq!(PaymentMethod::MobileMoney.as_str(), "mobile-money");
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }
}
