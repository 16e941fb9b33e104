use super::columns::SortColumn;
use super::descriptor::Sort;

/// ORDER BY clause for a single whitelisted column, followed by the column
/// set's primary key so equal sort values still page deterministically.
#[derive(Debug, Clone, Copy)]
pub struct Order<C: SortColumn> {
    sort: Sort<C>,
}

impl<C: SortColumn> Order<C> {
    pub fn new(sort: Sort<C>) -> Self {
        Order { sort }
    }

    pub fn to_order_clause(&self) -> String {
        let mut order_clause = "\nORDER BY ".to_string();

        order_clause.push_str(self.sort.column.name_db());

        if let Some(collation) = self.sort.column.collation() {
            order_clause.push_str(" COLLATE ");
            order_clause.push_str(collation);
        }

        order_clause.push(' ');
        order_clause.push_str(self.sort.direction.as_sql());

        order_clause.push_str(", ");
        order_clause.push_str(C::TIEBREAK_DB);
        order_clause.push_str(" ASC");

        order_clause
    }
}
