//! Number format types

/// Number format for cell display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Built-in format by ID
    BuiltIn(u32),

    /// Custom format string
    Custom(String),
}

impl NumberFormat {
    // Built-in format IDs
    /// 0 - General
    pub const ID_GENERAL: u32 = 0;
    /// 1 - 0
    pub const ID_NUMBER_INT: u32 = 1;
    /// 2 - 0.00
    pub const ID_NUMBER_DEC2: u32 = 2;
    /// 3 - #,##0
    pub const ID_NUMBER_SEP: u32 = 3;
    /// 4 - #,##0.00
    pub const ID_NUMBER_SEP_DEC2: u32 = 4;
    /// 9 - 0%
    pub const ID_PERCENT_INT: u32 = 9;
    /// 10 - 0.00%
    pub const ID_PERCENT_DEC2: u32 = 10;
    /// 11 - 0.00E+00
    pub const ID_SCIENTIFIC: u32 = 11;
    /// 12 - # ?/?
    pub const ID_FRACTION: u32 = 12;
    /// 13 - # ??/??
    pub const ID_FRACTION2: u32 = 13;
    /// 14 - mm-dd-yy
    pub const ID_DATE_SHORT: u32 = 14;
    /// 15 - d-mmm-yy
    pub const ID_DATE_MEDIUM: u32 = 15;
    /// 16 - d-mmm
    pub const ID_DATE_DAY_MONTH: u32 = 16;
    /// 17 - mmm-yy
    pub const ID_DATE_MONTH_YEAR: u32 = 17;
    /// 18 - h:mm AM/PM
    pub const ID_TIME_AMPM: u32 = 18;
    /// 19 - h:mm:ss AM/PM
    pub const ID_TIME_AMPM_SEC: u32 = 19;
    /// 20 - h:mm
    pub const ID_TIME_24H: u32 = 20;
    /// 21 - h:mm:ss
    pub const ID_TIME_24H_SEC: u32 = 21;
    /// 22 - m/d/yy h:mm
    pub const ID_DATETIME: u32 = 22;
    /// 37 - #,##0 ;(#,##0)
    pub const ID_ACCOUNTING_INT: u32 = 37;
    /// 38 - #,##0 ;[Red](#,##0)
    pub const ID_ACCOUNTING_INT_RED: u32 = 38;
    /// 39 - #,##0.00;(#,##0.00)
    pub const ID_ACCOUNTING_DEC2: u32 = 39;
    /// 40 - #,##0.00;[Red](#,##0.00)
    pub const ID_ACCOUNTING_DEC2_RED: u32 = 40;
    /// 49 - @
    pub const ID_TEXT: u32 = 49;
}
