//! Catalog use cases.

use std::collections::HashSet;
use std::sync::Arc;

use booking_store::{Subject, SubjectCatalog, SubjectId, Subjects};

use crate::commands::CreateSubject;
use crate::error::{BookingError, Result};

/// Manages bookable subjects and their tags.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn SubjectCatalog>,
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(catalog: Arc<dyn SubjectCatalog>) -> Self {
        Self { catalog }
    }

    /// Adds a subject under a fresh identity and attaches its tags.
    ///
    /// Either the subject is stored with all of its tags or nothing is kept.
    /// A tag repeated in the command fails with `DuplicateTag` before anything
    /// is stored.
    #[tracing::instrument(skip(self))]
    pub async fn add_subject(&self, cmd: CreateSubject) -> Result<Subject> {
        let id = self.catalog.next_identity().await?;

        let mut seen = HashSet::new();
        if let Some(tag) = cmd.tags.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(BookingError::DuplicateTag {
                subject_id: id,
                tag: tag.clone(),
            });
        }

        let subject = Subject::new(id, cmd.name);
        self.catalog.add(subject.clone()).await?;

        if let Err(e) = self.add_tags(id, &cmd.tags).await {
            if let Err(undo) = self.catalog.remove(id).await {
                tracing::warn!(subject_id = %id, error = %undo, "failed to roll back subject");
            }
            return Err(e);
        }

        metrics::counter!("subjects_created_total").increment(1);
        tracing::info!(subject_id = %id, "subject created");
        Ok(subject)
    }

    /// Attaches tags in order, stopping at the first failure.
    #[tracing::instrument(skip(self))]
    pub async fn add_tags(&self, id: SubjectId, tags: &[String]) -> Result<()> {
        for tag in tags {
            self.catalog.add_tag(id, tag).await?;
        }
        Ok(())
    }

    pub async fn list_subjects(&self) -> Result<Subjects> {
        Ok(self.catalog.list().await?)
    }

    /// Tags of a subject in alphabetical order.
    pub async fn subject_tags(&self, id: SubjectId) -> Result<Vec<String>> {
        Ok(self.catalog.get_tags(id).await?)
    }

    /// Subjects carrying every one of `tags`, ordered by id.
    pub async fn find_by_tags(&self, tags: &[String]) -> Result<Subjects> {
        Ok(self.catalog.get_by_tags(tags).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Subject> {
        Ok(self.catalog.get_by_name(name).await?)
    }

    pub async fn get(&self, id: SubjectId) -> Result<Subject> {
        Ok(self.catalog.get(id).await?)
    }

    /// Removes a subject and its tags. Its reservations stay in the ledger
    /// and drop out of the read model.
    #[tracing::instrument(skip(self))]
    pub async fn remove_subject(&self, id: SubjectId) -> Result<()> {
        self.catalog.remove(id).await?;
        tracing::info!(subject_id = %id, "subject removed");
        Ok(())
    }
}
