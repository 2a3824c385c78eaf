use serde::{Deserialize, Serialize};

use crate::models::{AbnormalFlag, Distribution, ResponseTime};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReqDto {
    /// Absent or `null` is rejected; an empty token is passed through
    pub application_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeResDto {
    pub response_time: f64,
}

impl From<ResponseTime> for ResponseTimeResDto {
    fn from(value: ResponseTime) -> Self {
        Self {
            response_time: value.average,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferrerDto {
    pub referrer: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerResDto {
    pub referrer_dto_list: Vec<ReferrerDto>,
}

impl From<Distribution> for ReferrerResDto {
    fn from(value: Distribution) -> Self {
        Self {
            referrer_dto_list: value
                .entries
                .into_iter()
                .map(|e| ReferrerDto {
                    referrer: e.key,
                    count: e.count,
                    percentage: e.ratio,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCountDto {
    pub current_page: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCountResDto {
    pub user_count_dto_list: Vec<UserCountDto>,
}

impl From<Distribution> for UserCountResDto {
    fn from(value: Distribution) -> Self {
        Self {
            user_count_dto_list: value
                .entries
                .into_iter()
                .map(|e| UserCountDto {
                    current_page: e.key,
                    count: e.count,
                    percentage: e.ratio,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AbnormalResDto {
    pub abnormal: bool,
}

impl From<AbnormalFlag> for AbnormalResDto {
    fn from(value: AbnormalFlag) -> Self {
        Self {
            abnormal: value.abnormal,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}
