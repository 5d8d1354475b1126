use super::api::CompanyRecord;
use super::IntegrationItem;

pub const COMPANY_ITEM_TYPE: &str = "company";

/// Transform a HubSpot company into an integration item.
///
/// The item id is the `hs_object_id` property; the record id becomes the parent.
pub fn company_to_item(company: &CompanyRecord) -> IntegrationItem {
    IntegrationItem {
        id: company.properties.hs_object_id.clone(),
        parent_id: company.id.clone(),
        item_type: COMPANY_ITEM_TYPE.to_string(),
        name: company.properties.name.clone(),
        creation_time: company.created_at.clone(),
        last_modified_time: company.updated_at.clone(),
        url: company.properties.domain.clone(),
    }
}
