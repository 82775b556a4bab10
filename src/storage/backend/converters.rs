use crate::storage::models::{Page, PageViewRecord, VisitHandle};
use migration::entities::{page, page_view};

/// 将 Sea-ORM Model 转换为 Page
pub fn model_to_page(model: page::Model) -> Page {
    Page {
        project_id: model.project_id,
        namespace_id: model.namespace_id,
        title: model.title,
    }
}

/// Join a visit row with its page into a consumer-facing copy.
pub fn model_to_record(model: page_view::Model, page: Page) -> PageViewRecord {
    PageViewRecord {
        handle: VisitHandle::new(model.id),
        page,
        timestamp: model.timestamp,
        number_of_seconds: model.number_of_seconds.max(0),
        previous: model.previous_page_view_id.map(VisitHandle::new),
    }
}
