// Declared shapes of the nine source tables.
//
// Every table shares the leading States/Years/Quarter dimensions and adds one
// more dimension (category, district or pincode) followed by its measures.
use serde::Serialize;
use std::fmt;

pub const STATES: &str = "States";
pub const YEARS: &str = "Years";
pub const QUARTER: &str = "Quarter";
pub const TRANSACTION_TYPE: &str = "Transaction_type";
pub const TRANSACTION_COUNT: &str = "Transaction_count";
pub const TRANSACTION_AMOUNT: &str = "Transaction_amount";
pub const BRANDS: &str = "Brands";
pub const PERCENTAGE: &str = "Percentage";
pub const DISTRICTS: &str = "Districts";
pub const PINCODES: &str = "Pincodes";
pub const REGISTERED_USERS: &str = "RegisteredUsers";
pub const APP_OPENS: &str = "AppOpens";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Dimension,
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub role: ColumnRole,
}

const fn dim(name: &'static str, ty: ColumnType) -> ColumnDef {
    ColumnDef { name, ty, role: ColumnRole::Dimension }
}

const fn measure(name: &'static str, ty: ColumnType) -> ColumnDef {
    ColumnDef { name, ty, role: ColumnRole::Measure }
}

const PERIOD_DIMS: [ColumnDef; 3] = [
    dim(STATES, ColumnType::Text),
    dim(YEARS, ColumnType::Integer),
    dim(QUARTER, ColumnType::Integer),
];

const AGG_TRANSACTION: [ColumnDef; 6] = [
    PERIOD_DIMS[0],
    PERIOD_DIMS[1],
    PERIOD_DIMS[2],
    dim(TRANSACTION_TYPE, ColumnType::Text),
    measure(TRANSACTION_COUNT, ColumnType::Integer),
    measure(TRANSACTION_AMOUNT, ColumnType::Decimal),
];

const MAP_TRANSACTION: [ColumnDef; 6] = [
    PERIOD_DIMS[0],
    PERIOD_DIMS[1],
    PERIOD_DIMS[2],
    dim(DISTRICTS, ColumnType::Text),
    measure(TRANSACTION_COUNT, ColumnType::Integer),
    measure(TRANSACTION_AMOUNT, ColumnType::Decimal),
];

const TOP_TRANSACTION: [ColumnDef; 6] = [
    PERIOD_DIMS[0],
    PERIOD_DIMS[1],
    PERIOD_DIMS[2],
    dim(PINCODES, ColumnType::Text),
    measure(TRANSACTION_COUNT, ColumnType::Integer),
    measure(TRANSACTION_AMOUNT, ColumnType::Decimal),
];

const AGG_USER: [ColumnDef; 6] = [
    PERIOD_DIMS[0],
    PERIOD_DIMS[1],
    PERIOD_DIMS[2],
    dim(BRANDS, ColumnType::Text),
    measure(TRANSACTION_COUNT, ColumnType::Integer),
    measure(PERCENTAGE, ColumnType::Decimal),
];

const MAP_USER: [ColumnDef; 6] = [
    PERIOD_DIMS[0],
    PERIOD_DIMS[1],
    PERIOD_DIMS[2],
    dim(DISTRICTS, ColumnType::Text),
    measure(REGISTERED_USERS, ColumnType::Integer),
    measure(APP_OPENS, ColumnType::Integer),
];

const TOP_USER: [ColumnDef; 5] = [
    PERIOD_DIMS[0],
    PERIOD_DIMS[1],
    PERIOD_DIMS[2],
    dim(PINCODES, ColumnType::Text),
    measure(REGISTERED_USERS, ColumnType::Integer),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Domain {
    Transaction,
    User,
    Insurance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Granularity {
    /// Broken down by a category (transaction type or device brand).
    Aggregated,
    /// Broken down by district.
    Map,
    /// Top pincodes.
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TableKind {
    AggregatedTransaction,
    MapTransaction,
    TopTransaction,
    AggregatedUser,
    MapUser,
    TopUser,
    AggregatedInsurance,
    MapInsurance,
    TopInsurance,
}

impl TableKind {
    pub const ALL: [TableKind; 9] = [
        TableKind::AggregatedTransaction,
        TableKind::MapTransaction,
        TableKind::TopTransaction,
        TableKind::AggregatedUser,
        TableKind::MapUser,
        TableKind::TopUser,
        TableKind::AggregatedInsurance,
        TableKind::MapInsurance,
        TableKind::TopInsurance,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            TableKind::AggregatedTransaction => "aggregated_transaction",
            TableKind::MapTransaction => "map_transaction",
            TableKind::TopTransaction => "top_transaction",
            TableKind::AggregatedUser => "aggregated_user",
            TableKind::MapUser => "map_user",
            TableKind::TopUser => "top_user",
            TableKind::AggregatedInsurance => "aggregated_insurance",
            TableKind::MapInsurance => "map_insurance",
            TableKind::TopInsurance => "top_insurance",
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            TableKind::AggregatedTransaction | TableKind::MapTransaction | TableKind::TopTransaction => {
                Domain::Transaction
            }
            TableKind::AggregatedUser | TableKind::MapUser | TableKind::TopUser => Domain::User,
            TableKind::AggregatedInsurance | TableKind::MapInsurance | TableKind::TopInsurance => {
                Domain::Insurance
            }
        }
    }

    pub fn granularity(self) -> Granularity {
        match self {
            TableKind::AggregatedTransaction | TableKind::AggregatedUser | TableKind::AggregatedInsurance => {
                Granularity::Aggregated
            }
            TableKind::MapTransaction | TableKind::MapUser | TableKind::MapInsurance => Granularity::Map,
            TableKind::TopTransaction | TableKind::TopUser | TableKind::TopInsurance => Granularity::Top,
        }
    }

    /// Declared columns in canonical order.
    pub fn columns(self) -> &'static [ColumnDef] {
        match self {
            TableKind::AggregatedTransaction | TableKind::AggregatedInsurance => &AGG_TRANSACTION,
            TableKind::MapTransaction | TableKind::MapInsurance => &MAP_TRANSACTION,
            TableKind::TopTransaction | TableKind::TopInsurance => &TOP_TRANSACTION,
            TableKind::AggregatedUser => &AGG_USER,
            TableKind::MapUser => &MAP_USER,
            TableKind::TopUser => &TOP_USER,
        }
    }

    pub fn column_names(self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.name).collect()
    }

    /// Indices of the columns forming the unique row key.
    pub fn key_indices(self) -> Vec<usize> {
        self.columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == ColumnRole::Dimension)
            .map(|(i, _)| i)
            .collect()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Domain::Transaction => "transaction",
            Domain::User => "user",
            Domain::Insurance => "insurance",
        })
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Aggregated => "category",
            Granularity::Map => "district",
            Granularity::Top => "pincode",
        })
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_leads_with_period_dimensions() {
        for kind in TableKind::ALL {
            let names = kind.column_names();
            assert_eq!(&names[..3], &[STATES, YEARS, QUARTER], "{kind}");
            assert_eq!(kind.key_indices(), vec![0, 1, 2, 3], "{kind}");
        }
    }

    #[test]
    fn insurance_tables_mirror_transaction_shapes() {
        assert_eq!(
            TableKind::MapInsurance.columns(),
            TableKind::MapTransaction.columns()
        );
        assert_eq!(TableKind::TopUser.columns().len(), 5);
        assert_eq!(TableKind::TopInsurance.domain(), Domain::Insurance);
        assert_eq!(TableKind::MapUser.granularity(), Granularity::Map);
        assert_eq!(TableKind::TopUser.granularity().to_string(), "pincode");
    }
}
