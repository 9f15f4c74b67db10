/// Declare a record struct and implement [`Record`](crate::record::Record) and
/// [`FromRow`](crate::FromRow) for it.
///
/// Field markers: `#[pk]` flags the primary key, `#[column = "name"]` overrides
/// the column name. Markers are consumed by the macro; doc comments are dropped.
///
/// ```rust
/// papergres::record! {
///     #[derive(Debug, Clone, Default)]
///     pub struct Book {
///         #[pk]
///         pub book_id: Option<i64>,
///         pub title: String,
///         #[column = "author"]
///         pub written_by: String,
///     }
/// }
///
/// use papergres::Record;
/// assert_eq!(Book::table_name(), "book");
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$smeta:meta])*
        $svis:vis struct $name:ident {
            $(
                $(#[$fattr:ident $(= $fval:literal)?])*
                $fvis:vis $fname:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$smeta])*
        $svis struct $name {
            $( $fvis $fname : $fty ),*
        }

        impl $crate::record::Record for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn fields(&self) -> ::std::vec::Vec<$crate::record::Field> {
                ::std::vec![
                    $(
                        $crate::record::Field::new(
                            stringify!($fname),
                            stringify!($fty),
                            $crate::SqlValue::from(::std::clone::Clone::clone(&self.$fname)),
                        )
                        $( .with_attr(stringify!($fattr), [$($fval,)? ""][0]) )*
                    ),*
                ]
            }
        }

        impl $crate::FromRow for $name {
            fn from_row(
                row: &$crate::DbRow,
            ) -> ::std::result::Result<Self, $crate::PapergresError> {
                ::std::result::Result::Ok(Self {
                    $(
                        $fname: row.decode(&$crate::record::column_for(
                            stringify!($fname),
                            &[$( (stringify!($fattr), [$($fval,)? ""][0]) ),*],
                        ))?,
                    )*
                })
            }
        }
    };
}
