use serde::{Deserialize, Serialize};
use xm_core::companies::{Company, CompanyFilter, CompanyInput};

/// Company representation exchanged over HTTP.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanyDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub phone: String,
}

impl From<Company> for CompanyDto {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            code: company.code,
            country: company.country,
            website: company.website,
            phone: company.phone,
        }
    }
}

// The id in a request body is ignored; the path or the server decides it.
impl From<CompanyDto> for CompanyInput {
    fn from(dto: CompanyDto) -> Self {
        Self {
            name: dto.name,
            code: dto.code,
            country: dto.country,
            website: dto.website,
            phone: dto.phone,
        }
    }
}

/// Optional equality filters for listing companies.
#[derive(Debug, Default, Deserialize)]
pub struct CompanyListQuery {
    pub name: Option<String>,
    pub code: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
}

impl CompanyListQuery {
    /// Filters for every non-empty parameter.
    pub fn filters(self) -> Vec<CompanyFilter> {
        [
            self.name.map(CompanyFilter::Name),
            self.code.map(CompanyFilter::Code),
            self.country.map(CompanyFilter::Country),
            self.website.map(CompanyFilter::Website),
            self.phone.map(CompanyFilter::Phone),
        ]
        .into_iter()
        .flatten()
        .filter(|filter| !filter.value().is_empty())
        .collect()
    }
}
