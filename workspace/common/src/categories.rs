use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which side of the ledger a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Expense,
    Income,
    /// Usable on both sides; the fallback category lives here.
    Neutral,
}

impl CategoryKind {
    /// Whether a category of this kind may be offered for the requested side.
    pub fn matches(self, wanted: CategoryKind) -> bool {
        self == wanted || self == CategoryKind::Neutral || wanted == CategoryKind::Neutral
    }
}

/// Static description of a category. Icon and color are opaque identifiers
/// that clients map onto their own assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub kind: CategoryKind,
}

/// Key used for anything without a (known) category.
pub const FALLBACK_CATEGORY: &str = "others";

/// Category preselected for new recurring expenses.
pub const DEFAULT_RECURRING_CATEGORY: &str = "bills";

#[rustfmt::skip]
pub static CATEGORIES: [Category; 13] = [
    Category { key: "food", label: "Alimentação", icon: "utensils", color: "orange-500", kind: CategoryKind::Expense },
    Category { key: "transport", label: "Transporte", icon: "car", color: "blue-500", kind: CategoryKind::Expense },
    Category { key: "housing", label: "Casa", icon: "home", color: "purple-500", kind: CategoryKind::Expense },
    Category { key: "shopping", label: "Compras", icon: "shopping-bag", color: "pink-500", kind: CategoryKind::Expense },
    Category { key: "entertainment", label: "Lazer", icon: "gamepad-2", color: "indigo-500", kind: CategoryKind::Expense },
    Category { key: "health", label: "Saúde", icon: "heart", color: "red-500", kind: CategoryKind::Expense },
    Category { key: "education", label: "Educação", icon: "book", color: "yellow-500", kind: CategoryKind::Expense },
    Category { key: "bills", label: "Contas", icon: "zap", color: "yellow-400", kind: CategoryKind::Expense },
    Category { key: "services", label: "Serviços", icon: "smartphone", color: "cyan-500", kind: CategoryKind::Expense },
    Category { key: "salary", label: "Salário", icon: "briefcase", color: "emerald-400", kind: CategoryKind::Income },
    Category { key: "investment", label: "Rendimentos", icon: "landmark", color: "blue-400", kind: CategoryKind::Income },
    Category { key: "extra", label: "Extra", icon: "circle-dollar-sign", color: "lime-400", kind: CategoryKind::Income },
    Category { key: "others", label: "Outros", icon: "shield", color: "gray-400", kind: CategoryKind::Neutral },
];

/// Looks a category up by key, falling back to `others` for unknown keys.
pub fn category(key: &str) -> &'static Category {
    CATEGORIES
        .iter()
        .find(|c| c.key == key)
        .or_else(|| CATEGORIES.iter().find(|c| c.key == FALLBACK_CATEGORY))
        .unwrap_or(&CATEGORIES[CATEGORIES.len() - 1])
}

pub fn is_known_category(key: &str) -> bool {
    CATEGORIES.iter().any(|c| c.key == key)
}

/// Categories selectable for the given side, in table order.
pub fn categories_for(kind: CategoryKind) -> impl Iterator<Item = &'static Category> {
    CATEGORIES.iter().filter(move |c| c.kind.matches(kind))
}
