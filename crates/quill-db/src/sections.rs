//! Outline section repository.
//!
//! The outline is a per-user forest of sections. Saving is wholesale: the
//! client sends the entire tree and the previous one is replaced inside a
//! single transaction. Reads reassemble the nested shape from the flat rows.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use quill_core::{
    new_v7, Error, Result, Section, SectionDescriptor, SectionNode, SectionPatch,
};

/// Nest flat section rows into sibling-ordered trees.
///
/// Roots are rows with `parent_id == None`. Siblings sort by `sort_order`,
/// ties by creation time.
pub fn build_forest(rows: Vec<Section>) -> Vec<SectionNode> {
    let mut children: HashMap<Option<Uuid>, Vec<Section>> = HashMap::new();
    for row in rows {
        children.entry(row.parent_id).or_default().push(row);
    }
    for group in children.values_mut() {
        group.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_at_utc.cmp(&b.created_at_utc))
        });
    }
    assemble(&mut children, None)
}

fn assemble(
    children: &mut HashMap<Option<Uuid>, Vec<Section>>,
    parent: Option<Uuid>,
) -> Vec<SectionNode> {
    let Some(group) = children.remove(&parent) else {
        return Vec::new();
    };
    group
        .into_iter()
        .map(|row| {
            let subsections = assemble(children, Some(row.id));
            SectionNode {
                id: row.id,
                title: row.title,
                summary: row.summary,
                sort_order: row.sort_order,
                subsections,
            }
        })
        .collect()
}

/// List a subtree's section ids children-first, so each id can be deleted
/// before its parent.
pub fn collect_postorder(rows: &[Section], root: Uuid) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        if let Some(parent) = row.parent_id {
            children.entry(parent).or_default().push(row.id);
        }
    }

    let mut order = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        stack.push((id, true));
        if let Some(kids) = children.get(&id) {
            for &kid in kids {
                stack.push((kid, false));
            }
        }
    }
    order
}

/// PostgreSQL outline section repository.
#[derive(Clone)]
pub struct PgSectionRepository {
    pool: PgPool,
}

impl PgSectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the user's entire outline with the given trees.
    ///
    /// An empty tree list is rejected; deleting everything goes through
    /// [`delete_subtree`](Self::delete_subtree) instead.
    pub async fn replace_all(&self, user_id: Uuid, trees: &[SectionDescriptor]) -> Result<usize> {
        if trees.is_empty() {
            return Err(Error::InvalidInput("Cannot save empty outline!".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let count = self.replace_all_tx(&mut tx, user_id, trees).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "sections",
            op = "replace_outline",
            user_id = %user_id,
            count = count,
            "Outline replaced"
        );
        Ok(count)
    }

    /// Transaction variant of [`replace_all`](Self::replace_all) without the
    /// empty-input guard, for callers composing larger transactions.
    pub async fn replace_all_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        trees: &[SectionDescriptor],
    ) -> Result<usize> {
        sqlx::query("DELETE FROM section WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        // Explicit stack instead of async recursion. Children go on in
        // reverse so each parent row exists before its children insert.
        let mut count = 0usize;
        let mut stack: Vec<(&SectionDescriptor, Option<Uuid>, i32)> = trees
            .iter()
            .enumerate()
            .rev()
            .map(|(i, node)| (node, None, i as i32))
            .collect();

        while let Some((node, parent_id, sort_order)) = stack.pop() {
            let id = new_v7();
            sqlx::query(
                "INSERT INTO section (id, user_id, parent_id, title, summary, sort_order)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(id)
            .bind(user_id)
            .bind(parent_id)
            .bind(&node.title)
            .bind(&node.summary)
            .bind(sort_order)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
            count += 1;

            for (i, child) in node.subsections.iter().enumerate().rev() {
                stack.push((child, Some(id), i as i32));
            }
        }

        Ok(count)
    }

    /// Load the user's full outline as nested trees.
    pub async fn list_forest(&self, user_id: Uuid) -> Result<Vec<SectionNode>> {
        let rows = self.load_rows(user_id).await?;
        Ok(build_forest(rows))
    }

    /// Load one section with its descendant subtree.
    pub async fn get_subtree(&self, user_id: Uuid, section_id: Uuid) -> Result<SectionNode> {
        let rows = self.load_rows(user_id).await?;
        if !rows.iter().any(|r| r.id == section_id) {
            return Err(Error::NotFound(format!("Section {} not found", section_id)));
        }
        subtree_of(rows, section_id)
            .ok_or_else(|| Error::NotFound(format!("Section {} not found", section_id)))
    }

    /// Patch a section's fields and return its refreshed subtree.
    pub async fn update(
        &self,
        user_id: Uuid,
        section_id: Uuid,
        patch: SectionPatch,
    ) -> Result<SectionNode> {
        let result = sqlx::query(
            r#"
            UPDATE section
            SET title = COALESCE($3, title),
                summary = COALESCE($4, summary),
                sort_order = COALESCE($5, sort_order)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(section_id)
        .bind(user_id)
        .bind(&patch.title)
        .bind(&patch.summary)
        .bind(patch.sort_order)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Section {} not found", section_id)));
        }
        self.get_subtree(user_id, section_id).await
    }

    /// Delete a section and its whole subtree, children first.
    pub async fn delete_subtree(&self, user_id: Uuid, section_id: Uuid) -> Result<()> {
        let rows = self.load_rows(user_id).await?;
        if !rows.iter().any(|r| r.id == section_id) {
            return Err(Error::NotFound(format!("Section {} not found", section_id)));
        }
        let order = collect_postorder(&rows, section_id);

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for id in &order {
            sqlx::query("DELETE FROM section WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "sections",
            op = "delete_subtree",
            user_id = %user_id,
            section_id = %section_id,
            count = order.len(),
            "Outline subtree deleted"
        );
        Ok(())
    }

    async fn load_rows(&self, user_id: Uuid) -> Result<Vec<Section>> {
        sqlx::query_as::<_, Section>(
            "SELECT id, user_id, parent_id, title, summary, sort_order, created_at_utc
             FROM section WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }
}

fn subtree_of(rows: Vec<Section>, root: Uuid) -> Option<SectionNode> {
    // Re-root the forest at the target by pretending it has no parent,
    // then pick it out of the rebuilt roots.
    let rows: Vec<Section> = rows
        .into_iter()
        .map(|mut row| {
            if row.id == root {
                row.parent_id = None;
            }
            row
        })
        .collect();
    build_forest(rows).into_iter().find(|node| node.id == root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn section(id: u128, parent: Option<u128>, title: &str, sort_order: i32) -> Section {
        Section {
            id: Uuid::from_u128(id),
            user_id: Uuid::nil(),
            parent_id: parent.map(Uuid::from_u128),
            title: title.to_string(),
            summary: None,
            sort_order,
            created_at_utc: Utc::now(),
        }
    }

    #[test]
    fn build_forest_nests_and_orders_siblings() {
        let rows = vec![
            section(2, None, "Methods", 1),
            section(1, None, "Intro", 0),
            section(3, Some(1), "Background", 0),
            section(4, Some(1), "Motivation", 1),
        ];
        let forest = build_forest(rows);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].title, "Intro");
        assert_eq!(forest[1].title, "Methods");
        assert_eq!(forest[0].subsections.len(), 2);
        assert_eq!(forest[0].subsections[0].title, "Background");
        assert_eq!(forest[0].subsections[1].title, "Motivation");
    }

    #[test]
    fn build_forest_handles_deep_nesting() {
        let rows = vec![
            section(1, None, "A", 0),
            section(2, Some(1), "B", 0),
            section(3, Some(2), "C", 0),
            section(4, Some(3), "D", 0),
        ];
        let forest = build_forest(rows);
        assert_eq!(forest.len(), 1);
        assert_eq!(
            forest[0].subsections[0].subsections[0].subsections[0].title,
            "D"
        );
    }

    #[test]
    fn build_forest_empty_input() {
        assert!(build_forest(vec![]).is_empty());
    }

    #[test]
    fn collect_postorder_lists_children_before_parents() {
        let rows = vec![
            section(1, None, "root", 0),
            section(2, Some(1), "child", 0),
            section(3, Some(2), "grandchild", 0),
            section(4, Some(1), "child2", 1),
        ];
        let order = collect_postorder(&rows, Uuid::from_u128(1));
        assert_eq!(order.len(), 4);
        assert_eq!(*order.last().unwrap(), Uuid::from_u128(1));
        let pos = |id: u128| order.iter().position(|&x| x == Uuid::from_u128(id)).unwrap();
        assert!(pos(3) < pos(2));
        assert!(pos(2) < pos(1));
        assert!(pos(4) < pos(1));
    }

    #[test]
    fn collect_postorder_leaf_only() {
        let rows = vec![section(1, None, "leaf", 0)];
        assert_eq!(
            collect_postorder(&rows, Uuid::from_u128(1)),
            vec![Uuid::from_u128(1)]
        );
    }

    #[test]
    fn subtree_of_picks_nested_node() {
        let rows = vec![
            section(1, None, "root", 0),
            section(2, Some(1), "mid", 0),
            section(3, Some(2), "leaf", 0),
        ];
        let node = subtree_of(rows, Uuid::from_u128(2)).unwrap();
        assert_eq!(node.title, "mid");
        assert_eq!(node.subsections[0].title, "leaf");
    }
}
