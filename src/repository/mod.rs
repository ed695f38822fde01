// ==========================================
// 温室气体中心报表 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 两个持久化查找表（供应点登记 / 年度排放因子）
// 约束: 所有查询使用参数化
// ==========================================

pub mod connection_point_repo;
pub mod error;
pub mod factor_repo;

// 重导出核心仓储
pub use connection_point_repo::ConnectionPointRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use factor_repo::{EmissionFactorEntity, FactorRepository};
