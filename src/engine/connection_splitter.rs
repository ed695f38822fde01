// ==========================================
// 温室气体中心报表 - 供应点分摊器
// ==========================================
// 职责: 一个供应点登记到 N 个中心时，数量与百分比 (100/N) 均分
// 未登记的供应点 / 无供应点的行: N = 1，归属行上的中心（或"无中心"桶）
// ==========================================

use crate::domain::billing::ConnectionPointRegistration;
use crate::repository::RepositoryResult;
use std::collections::HashMap;

// ==========================================
// RegistrationSource Trait
// ==========================================
pub trait RegistrationSource: Send + Sync {
    fn registrations(&self) -> RepositoryResult<Vec<ConnectionPointRegistration>>;
}

/// 单个中心分得的份额
#[derive(Debug, Clone, PartialEq)]
pub struct CenterShare {
    pub quantity: f64,
    pub percent: f64,
}

/// 单个中心的分摊结果（一条明细行）
#[derive(Debug, Clone, PartialEq)]
pub struct CenterAllocation {
    pub center: String,
    pub centers_at_point: usize,
    pub share: CenterShare,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionPointSplitter {
    centers: HashMap<String, Vec<String>>,
    marketers: HashMap<String, String>,
}

fn point_key(connection_point: &str) -> String {
    connection_point.trim().to_uppercase()
}

impl ConnectionPointSplitter {
    /// 由全部登记构建（同一供应点重复登记同一中心只计一次）
    pub fn new(registrations: &[ConnectionPointRegistration]) -> Self {
        let mut splitter = Self::default();
        for reg in registrations {
            let key = point_key(&reg.connection_point);
            let center = reg.center_name.trim();
            if key.is_empty() || center.is_empty() {
                continue;
            }
            let centers = splitter.centers.entry(key.clone()).or_default();
            if !centers.iter().any(|c| c == center) {
                centers.push(center.to_string());
            }
            if let Some(marketer) = reg.marketer.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
                splitter
                    .marketers
                    .entry(key)
                    .or_insert_with(|| marketer.to_string());
            }
        }
        splitter
    }

    pub fn from_source(source: &dyn RegistrationSource) -> RepositoryResult<Self> {
        Ok(Self::new(&source.registrations()?))
    }

    /// 共享该供应点的中心数（>= 1）
    pub fn centers_sharing(&self, connection_point: Option<&str>) -> usize {
        self.registered_centers(connection_point)
            .map(|c| c.len())
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }

    pub fn registered_centers(&self, connection_point: Option<&str>) -> Option<&[String]> {
        connection_point
            .and_then(|cp| self.centers.get(&point_key(cp)))
            .map(|v| v.as_slice())
    }

    /// 供应点登记的售电/售气公司
    pub fn marketer_for(&self, connection_point: Option<&str>) -> Option<&str> {
        connection_point
            .and_then(|cp| self.marketers.get(&point_key(cp)))
            .map(|s| s.as_str())
    }

    /// 均分: (quantity / N, 100 / N)
    pub fn per_center_share(&self, applicable_quantity: f64, count: usize) -> CenterShare {
        let n = count.max(1) as f64;
        CenterShare {
            quantity: applicable_quantity / n,
            percent: 100.0 / n,
        }
    }

    /// 将一行的年度适用数量分摊到各中心
    ///
    /// 登记的中心优先于行上的中心列
    pub fn split(
        &self,
        connection_point: Option<&str>,
        row_center: Option<&str>,
        applicable_quantity: f64,
        unassigned_label: &str,
    ) -> Vec<CenterAllocation> {
        match self.registered_centers(connection_point) {
            Some(centers) if !centers.is_empty() => {
                let share = self.per_center_share(applicable_quantity, centers.len());
                centers
                    .iter()
                    .map(|center| CenterAllocation {
                        center: center.clone(),
                        centers_at_point: centers.len(),
                        share: share.clone(),
                    })
                    .collect()
            }
            _ => {
                let center = row_center
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(unassigned_label);
                vec![CenterAllocation {
                    center: center.to_string(),
                    centers_at_point: 1,
                    share: self.per_center_share(applicable_quantity, 1),
                }]
            }
        }
    }

    pub fn registered_point_count(&self) -> usize {
        self.centers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(cp: &str, center: &str, marketer: Option<&str>) -> ConnectionPointRegistration {
        ConnectionPointRegistration {
            connection_point: cp.to_string(),
            center_name: center.to_string(),
            marketer: marketer.map(str::to_string),
        }
    }

    fn splitter() -> ConnectionPointSplitter {
        ConnectionPointSplitter::new(&[
            reg("ES001", "Sede Central", Some("Iberdrola Clientes")),
            reg("es001", "Almacén Norte", None),
            reg("ES001", "Sede Central", None),
            reg("ES002", "Oficina Sur", None),
        ])
    }

    #[test]
    fn test_centers_sharing() {
        let s = splitter();
        assert_eq!(s.centers_sharing(Some("ES001")), 2);
        assert_eq!(s.centers_sharing(Some(" es002 ")), 1);
        assert_eq!(s.centers_sharing(Some("ES999")), 1);
        assert_eq!(s.centers_sharing(None), 1);
        assert_eq!(s.registered_point_count(), 2);
    }

    #[test]
    fn test_shared_point_splits_evenly() {
        let s = splitter();
        let allocations = s.split(Some("ES001"), Some("Ignorado"), 100.0, "SIN CENTRO");

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].center, "Sede Central");
        assert_eq!(allocations[1].center, "Almacén Norte");
        for a in &allocations {
            assert_eq!(a.share.quantity, 50.0);
            assert_eq!(a.share.percent, 50.0);
            assert_eq!(a.centers_at_point, 2);
        }
        let total: f64 = allocations.iter().map(|a| a.share.quantity).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_way_split_sums_back() {
        let s = ConnectionPointSplitter::new(&[
            reg("ES003", "A", None),
            reg("ES003", "B", None),
            reg("ES003", "C", None),
        ]);
        let allocations = s.split(Some("ES003"), None, 10.0, "SIN CENTRO");
        let total: f64 = allocations.iter().map(|a| a.share.quantity).sum();
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unregistered_point_uses_row_center_or_sentinel() {
        let s = splitter();
        let own = s.split(Some("ES999"), Some("Planta Este"), 40.0, "SIN CENTRO");
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].center, "Planta Este");
        assert_eq!(own[0].share.percent, 100.0);

        let none = s.split(None, None, 40.0, "SIN CENTRO");
        assert_eq!(none[0].center, "SIN CENTRO");
        assert_eq!(none[0].share.quantity, 40.0);
    }

    #[test]
    fn test_marketer_for() {
        let s = splitter();
        assert_eq!(s.marketer_for(Some("ES001")), Some("Iberdrola Clientes"));
        assert_eq!(s.marketer_for(Some("ES002")), None);
        assert_eq!(s.marketer_for(None), None);
    }
}
