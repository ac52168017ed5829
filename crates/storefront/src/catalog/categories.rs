//! Product category tree.
//!
//! Categories are client-side only: the tree is seeded with the default
//! electrical categories and edited in memory by the back office. Two levels
//! are used in practice (voltage family, then product family) but nothing
//! limits the depth.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// A catalog category. Product rows reference categories by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub order: i32,
}

/// Payload for adding a category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewCategory {
    pub name: String,
    /// Derived from `name` when blank
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub order: i32,
}

/// Partial update of a category. `None` fields are left as they are.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub order: Option<i32>,
}

/// Category tree errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("Category not found: {0}")]
    NotFound(String),
    #[error("Category name must not be empty")]
    EmptyName,
    #[error("Category slug already used: {0}")]
    DuplicateSlug(String),
    #[error("Unknown parent category: {0}")]
    UnknownParent(String),
    #[error("Category {0} cannot be its own ancestor")]
    Cycle(String),
    #[error("Category {0} still has sub-categories")]
    HasChildren(String),
}

fn category(id: &str, name: &str, slug: &str, parent: Option<&str>, order: i32) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        parent_id: parent.map(str::to_string),
        order,
    }
}

/// The categories a fresh storefront starts with.
#[must_use]
pub fn default_categories() -> Vec<Category> {
    vec![
        category("bt", "Basse Tension", "basse-tension", None, 1),
        category("mt", "Moyenne Tension", "moyenne-tension", None, 2),
        category("disjoncteurs", "Disjoncteurs", "disjoncteurs", Some("bt"), 1),
        category("armoires", "Armoires électriques", "armoires-electriques", Some("bt"), 2),
        category(
            "protection",
            "Protection différentielle",
            "protection-differentielle",
            Some("bt"),
            3,
        ),
        category("transformateurs", "Transformateurs", "transformateurs", Some("mt"), 1),
        category("cablage", "Câblage HTA", "cablage-hta", Some("mt"), 2),
        category("automation", "Automation", "automation", None, 3),
        category("eclairage", "Éclairage", "eclairage", None, 4),
    ]
}

/// URL slug for a category name: lowercase ASCII, accents folded, words
/// joined by `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'ç' => 'c',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            c if c.is_ascii_alphanumeric() => c,
            _ => ' ',
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Shared, editable category tree.
///
/// Cloning shares the tree.
#[derive(Debug, Clone)]
pub struct CategoryService {
    categories: Arc<RwLock<Vec<Category>>>,
}

impl Default for CategoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryService {
    /// Tree seeded with [`default_categories`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_categories(default_categories())
    }

    #[must_use]
    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self {
            categories: Arc::new(RwLock::new(categories)),
        }
    }

    /// Every category, in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<Category> {
        self.read(<[Category]>::to_vec)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Category> {
        self.read(|cats| cats.iter().find(|c| c.id == id).cloned())
    }

    /// Top-level categories sorted by `order`.
    #[must_use]
    pub fn root_categories(&self) -> Vec<Category> {
        self.children_of(None)
    }

    /// Direct children of `parent_id` sorted by `order`.
    #[must_use]
    pub fn sub_categories(&self, parent_id: &str) -> Vec<Category> {
        self.children_of(Some(parent_id))
    }

    fn children_of(&self, parent: Option<&str>) -> Vec<Category> {
        let mut children = self.read(|cats| {
            cats.iter()
                .filter(|c| c.parent_id.as_deref() == parent)
                .cloned()
                .collect::<Vec<_>>()
        });
        children.sort_by_key(|c| c.order);
        children
    }

    /// Add a category. Its id is its slug.
    ///
    /// # Errors
    ///
    /// Returns error if the name is blank, the slug is taken, or the parent
    /// does not exist.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn add(&self, new: NewCategory) -> Result<Category, CategoryError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        let slug = if new.slug.trim().is_empty() {
            slugify(name)
        } else {
            slugify(&new.slug)
        };

        let mut cats = self.write();
        if cats.iter().any(|c| c.slug == slug || c.id == slug) {
            return Err(CategoryError::DuplicateSlug(slug));
        }
        if let Some(parent) = &new.parent_id
            && !cats.iter().any(|c| &c.id == parent)
        {
            return Err(CategoryError::UnknownParent(parent.clone()));
        }

        let created = Category {
            id: slug.clone(),
            name: name.to_string(),
            slug,
            description: new.description.filter(|d| !d.trim().is_empty()),
            parent_id: new.parent_id,
            order: new.order,
        };
        cats.push(created.clone());
        debug!(id = %created.id, "Category added");
        Ok(created)
    }

    /// Apply `update` to the category `id`.
    ///
    /// # Errors
    ///
    /// Returns error if the category or new parent does not exist, the new
    /// slug is taken, the new name is blank, or re-parenting would create a
    /// cycle.
    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: CategoryUpdate) -> Result<Category, CategoryError> {
        let mut cats = self.write();
        if !cats.iter().any(|c| c.id == id) {
            return Err(CategoryError::NotFound(id.to_string()));
        }
        if let Some(name) = &update.name
            && name.trim().is_empty()
        {
            return Err(CategoryError::EmptyName);
        }
        let slug = update.slug.as_deref().map(slugify);
        if let Some(slug) = &slug
            && cats.iter().any(|c| c.id != id && &c.slug == slug)
        {
            return Err(CategoryError::DuplicateSlug(slug.clone()));
        }
        if let Some(Some(parent)) = &update.parent_id {
            if !cats.iter().any(|c| &c.id == parent) {
                return Err(CategoryError::UnknownParent(parent.clone()));
            }
            if is_descendant_or_self(&cats, parent, id) {
                return Err(CategoryError::Cycle(id.to_string()));
            }
        }

        let target = cats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CategoryError::NotFound(id.to_string()))?;
        if let Some(name) = update.name {
            target.name = name.trim().to_string();
        }
        if let Some(slug) = slug {
            target.slug = slug;
        }
        if let Some(description) = update.description {
            target.description = description;
        }
        if let Some(parent_id) = update.parent_id {
            target.parent_id = parent_id;
        }
        if let Some(order) = update.order {
            target.order = order;
        }
        debug!(id, "Category updated");
        Ok(target.clone())
    }

    /// Remove the category `id`.
    ///
    /// # Errors
    ///
    /// Returns error if the category does not exist or still has children.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<Category, CategoryError> {
        let mut cats = self.write();
        if cats.iter().any(|c| c.parent_id.as_deref() == Some(id)) {
            return Err(CategoryError::HasChildren(id.to_string()));
        }
        let index = cats
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CategoryError::NotFound(id.to_string()))?;
        debug!(id, "Category deleted");
        Ok(cats.remove(index))
    }

    fn read<T>(&self, f: impl FnOnce(&[Category]) -> T) -> T {
        f(&self.categories.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Category>> {
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether `candidate` is `root` or sits somewhere below it.
fn is_descendant_or_self(cats: &[Category], candidate: &str, root: &str) -> bool {
    let mut current = Some(candidate.to_string());
    let mut hops = 0;
    while let Some(id) = current {
        if id == root {
            return true;
        }
        hops += 1;
        if hops > cats.len() {
            return false;
        }
        current = cats
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.parent_id.clone());
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(cats: &[Category]) -> Vec<&str> {
        cats.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_default_tree() {
        let service = CategoryService::new();
        assert_eq!(
            ids(&service.root_categories()),
            ["bt", "mt", "automation", "eclairage"]
        );
        assert_eq!(
            ids(&service.sub_categories("bt")),
            ["disjoncteurs", "armoires", "protection"]
        );
        assert_eq!(ids(&service.sub_categories("mt")), ["transformateurs", "cablage"]);
        assert!(service.sub_categories("eclairage").is_empty());
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Armoires électriques"), "armoires-electriques");
        assert_eq!(slugify("  Câblage  HTA / BT "), "cablage-hta-bt");
    }

    #[test]
    fn test_add_sorted_into_parent() {
        let service = CategoryService::new();
        let added = service
            .add(NewCategory {
                name: "Contacteurs".into(),
                parent_id: Some("bt".into()),
                order: 0,
                ..NewCategory::default()
            })
            .unwrap();
        assert_eq!(added.id, "contacteurs");
        assert_eq!(
            ids(&service.sub_categories("bt")),
            ["contacteurs", "disjoncteurs", "armoires", "protection"]
        );

        let err = service
            .add(NewCategory {
                name: "Disjoncteurs".into(),
                ..NewCategory::default()
            })
            .unwrap_err();
        assert_eq!(err, CategoryError::DuplicateSlug("disjoncteurs".into()));

        let err = service
            .add(NewCategory {
                name: "Onduleurs".into(),
                parent_id: Some("ht".into()),
                ..NewCategory::default()
            })
            .unwrap_err();
        assert_eq!(err, CategoryError::UnknownParent("ht".into()));
    }

    #[test]
    fn test_update_moves_and_rejects_cycles() {
        let service = CategoryService::new();
        let moved = service
            .update(
                "eclairage",
                CategoryUpdate {
                    parent_id: Some(Some("bt".into())),
                    order: Some(9),
                    ..CategoryUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("bt"));
        assert_eq!(service.sub_categories("bt").last().unwrap().id, "eclairage");

        let err = service
            .update(
                "bt",
                CategoryUpdate {
                    parent_id: Some(Some("disjoncteurs".into())),
                    ..CategoryUpdate::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, CategoryError::Cycle("bt".into()));
    }

    #[test]
    fn test_delete_requires_leaf() {
        let service = CategoryService::new();
        assert_eq!(
            service.delete("mt").unwrap_err(),
            CategoryError::HasChildren("mt".into())
        );
        service.delete("cablage").unwrap();
        service.delete("transformateurs").unwrap();
        service.delete("mt").unwrap();
        assert!(service.get("mt").is_none());
        assert_eq!(
            service.delete("mt").unwrap_err(),
            CategoryError::NotFound("mt".into())
        );
    }

    #[test]
    fn test_clones_share_tree() {
        let service = CategoryService::new();
        let other = service.clone();
        other.delete("automation").unwrap();
        assert!(service.get("automation").is_none());
    }
}
