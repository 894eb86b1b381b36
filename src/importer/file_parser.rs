// ==========================================
// 企业档案导入 - 文件解析器实现
// ==========================================
// 职责: 字节流 → 原始行 + 工作表元信息（不理解字段语义）
// 支持: Excel (.xlsx/.xls) / CSV (.csv，UTF-8 或 Latin-1)
// ==========================================

use crate::domain::import::{ParsedFile, RawImportRow, SheetInfo};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use chrono::Timelike;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 分隔符候选（并列时按此顺序取第一个）
const DELIMITER_CANDIDATES: [u8; 3] = [b',', b';', b'\t'];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

// ==========================================
// FileFormat - 文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xls,
    Xlsx,
}

impl FileFormat {
    /// 从声明的扩展名 / 文件名 / MIME 类型识别格式
    pub fn from_declared(declared: &str) -> Option<Self> {
        let lower = declared.trim().to_lowercase();
        match lower.as_str() {
            "text/csv" | "application/csv" => return Some(FileFormat::Csv),
            "application/vnd.ms-excel" => return Some(FileFormat::Xls),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                return Some(FileFormat::Xlsx)
            }
            _ => {}
        }

        let ext = lower.rsplit('.').next().unwrap_or("");
        match ext {
            "csv" => Some(FileFormat::Csv),
            "xls" => Some(FileFormat::Xls),
            "xlsx" => Some(FileFormat::Xlsx),
            _ => None,
        }
    }

    /// 按文件头魔数识别电子表格
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(ZIP_MAGIC) {
            Some(FileFormat::Xlsx)
        } else if bytes.starts_with(OLE_MAGIC) {
            Some(FileFormat::Xls)
        } else {
            None
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        !matches!(self, FileFormat::Csv)
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 解码字节流：优先 UTF-8（去 BOM），失败时按 Latin-1 解码
    pub fn decode(bytes: &[u8]) -> ImportResult<String> {
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let content = match std::str::from_utf8(body) {
            Ok(text) => text.to_string(),
            Err(_) => {
                debug!("UTF-8 解码失败，回退 Latin-1");
                let (text, _, _) = encoding_rs::WINDOWS_1252.decode(body);
                text.into_owned()
            }
        };

        if content.contains('\0') {
            return Err(ImportError::UnreadableFile(
                "CSV 内容包含二进制数据".to_string(),
            ));
        }
        Ok(content)
    }

    /// 按首行出现次数最多的字符确定分隔符
    pub fn detect_delimiter(content: &str) -> u8 {
        let first_line = content.lines().next().unwrap_or("");
        let mut best = DELIMITER_CANDIDATES[0];
        let mut best_count = 0;
        for candidate in DELIMITER_CANDIDATES {
            let count = first_line.bytes().filter(|b| *b == candidate).count();
            if count > best_count {
                best = candidate;
                best_count = count;
            }
        }
        best
    }

    pub fn parse_content(&self, content: &str) -> ImportResult<ParsedFile> {
        if content.trim().is_empty() {
            return Err(ImportError::EmptyFile("CSV 文件为空".to_string()));
        }

        let delimiter = Self::detect_delimiter(content);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(content.as_bytes());

        let headers = sanitize_headers(reader.headers()?.iter().map(str::to_string).collect());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
            if let Some(row) = build_row(&headers, cells, rows.len() + 1) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(ImportError::EmptyFile("CSV 文件无数据行".to_string()));
        }

        debug!(
            delimiter = %(delimiter as char).escape_default(),
            columns = headers.len(),
            rows = rows.len(),
            "CSV 解析完成"
        );

        Ok(ParsedFile {
            headers,
            rows,
            is_spreadsheet: false,
            available_sheets: Vec::new(),
            selected_sheet: None,
        })
    }
}

impl FileParser for CsvParser {
    fn parse(&self, bytes: &[u8], _selected_sheet: Option<&str>) -> ImportResult<ParsedFile> {
        let content = Self::decode(bytes)?;
        self.parse_content(&content)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 读取工作表：首个非空行为表头，其后为数据行
    fn read_range(range: &Range<Data>) -> (Vec<String>, Vec<RawImportRow>) {
        let mut row_iter = range
            .rows()
            .skip_while(|row| row.iter().all(|c| cell_to_string(c).is_empty()));

        let headers = match row_iter.next() {
            Some(header_row) => sanitize_headers(header_row.iter().map(cell_to_string).collect()),
            None => return (Vec::new(), Vec::new()),
        };

        let mut rows = Vec::new();
        for data_row in row_iter {
            let cells = data_row.iter().map(cell_to_string).collect();
            if let Some(row) = build_row(&headers, cells, rows.len() + 1) {
                rows.push(row);
            }
        }
        (headers, rows)
    }
}

impl FileParser for ExcelParser {
    fn parse(&self, bytes: &[u8], selected_sheet: Option<&str>) -> ImportResult<ParsedFile> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ImportError::UnreadableFile(format!("Excel 打开失败: {}", e)))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::UnreadableFile("Excel 文件无工作表".to_string()));
        }

        // 多表时收集元信息，供调用方选择
        let mut available_sheets = Vec::new();
        if sheet_names.len() > 1 {
            for name in &sheet_names {
                let range = workbook.worksheet_range(name)?;
                let (headers, rows) = Self::read_range(&range);
                available_sheets.push(SheetInfo {
                    name: name.clone(),
                    row_count: rows.len(),
                    column_count: headers.len(),
                });
            }
        }

        let sheet_name = match selected_sheet {
            Some(name) => {
                if !sheet_names.iter().any(|n| n == name) {
                    return Err(ImportError::SheetNotFound(name.to_string()));
                }
                name.to_string()
            }
            None if sheet_names.len() == 1 => sheet_names[0].clone(),
            None => {
                info!(sheets = sheet_names.len(), "多工作表文件，等待选择工作表");
                return Ok(ParsedFile {
                    headers: Vec::new(),
                    rows: Vec::new(),
                    is_spreadsheet: true,
                    available_sheets,
                    selected_sheet: None,
                });
            }
        };

        let range = workbook.worksheet_range(&sheet_name)?;
        let (headers, rows) = Self::read_range(&range);
        if rows.is_empty() {
            return Err(ImportError::EmptyFile(format!("工作表 {} 无数据行", sheet_name)));
        }

        debug!(sheet = %sheet_name, columns = headers.len(), rows = rows.len(), "工作表解析完成");

        Ok(ParsedFile {
            headers,
            rows,
            is_spreadsheet: true,
            available_sheets,
            selected_sheet: Some(sheet_name),
        })
    }
}

// ==========================================
// 通用文件解析器（根据声明格式 / 文件头自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 确定文件格式
    ///
    /// # 规则
    /// 1. 声明格式可识别 → 使用声明格式
    /// 2. 否则按魔数识别电子表格
    /// 3. 未声明且内容为文本 → CSV
    /// 4. 其他 → UnsupportedFormat
    pub fn resolve_format(bytes: &[u8], declared: Option<&str>) -> ImportResult<FileFormat> {
        if let Some(format) = declared.and_then(FileFormat::from_declared) {
            return Ok(format);
        }
        if let Some(format) = FileFormat::sniff(bytes) {
            return Ok(format);
        }
        match declared {
            None if CsvParser::decode(bytes).is_ok() => Ok(FileFormat::Csv),
            None => Err(ImportError::UnsupportedFormat("unknown".to_string())),
            Some(d) => Err(ImportError::UnsupportedFormat(d.to_string())),
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn parse(
        &self,
        bytes: &[u8],
        declared: Option<&str>,
        selected_sheet: Option<&str>,
    ) -> ImportResult<ParsedFile> {
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile("文件为空".to_string()));
        }

        let format = Self::resolve_format(bytes, declared)?;
        debug!(format = ?format, "文件格式已确定");

        let parsed = match format {
            FileFormat::Csv => CsvParser.parse(bytes, selected_sheet)?,
            FileFormat::Xls | FileFormat::Xlsx => ExcelParser.parse(bytes, selected_sheet)?,
        };

        info!(
            rows = parsed.rows.len(),
            sheets = parsed.available_sheets.len(),
            "文件解析完成"
        );
        Ok(parsed)
    }

    /// 从文件路径读取并解析（格式取自扩展名）
    pub fn parse_path<P: AsRef<Path>>(
        &self,
        file_path: P,
        selected_sheet: Option<&str>,
    ) -> ImportResult<ParsedFile> {
        let path = file_path.as_ref();
        let bytes = std::fs::read(path)?;
        let declared = path.file_name().and_then(|n| n.to_str());
        self.parse(&bytes, declared, selected_sheet)
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 表头清洗：TRIM，空表头命名为 "Column N"，重名追加 " (2)" 等后缀
fn sanitize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let trimmed = header.trim();
            let base = if trimmed.is_empty() {
                format!("Column {}", idx + 1)
            } else {
                trimmed.to_string()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{} ({})", base, count)
            }
        })
        .collect()
}

/// 按表头组装数据行；全空行返回 None
fn build_row(headers: &[String], cells: Vec<String>, row_number: usize) -> Option<RawImportRow> {
    let mut cells = cells.into_iter();
    let raw_data: Vec<(String, String)> = headers
        .iter()
        .map(|h| (h.clone(), cells.next().unwrap_or_default()))
        .collect();

    let row = RawImportRow::new(row_number, raw_data);
    if row.is_blank() {
        None
    } else {
        Some(row)
    }
}

/// 单元格转字符串；整数值浮点数去掉小数部分（避免 SIRET 变成 1.2e13）
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) | Data::DateTimeIso(_) => date_cell_to_string(cell),
        other => other.to_string().trim().to_string(),
    }
}

/// 日期单元格转 ISO 字符串；零点时刻只保留日期部分
fn date_cell_to_string(cell: &Data) -> String {
    if let Some(dt) = cell.as_datetime() {
        if dt.num_seconds_from_midnight() == 0 {
            dt.format("%Y-%m-%d").to_string()
        } else {
            dt.format("%Y-%m-%d %H:%M:%S").to_string()
        }
    } else if let Some(date) = cell.as_date() {
        date.format("%Y-%m-%d").to_string()
    } else {
        cell.to_string().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parser_valid_content() {
        let content = "Raison sociale,SIRET,Region\nAcme SARL,12345678901234,Bretagne\n";
        let parsed = CsvParser.parse(content.as_bytes(), None).unwrap();

        assert_eq!(parsed.headers, vec!["Raison sociale", "SIRET", "Region"]);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].row_number, 1);
        assert_eq!(parsed.rows[0].get("SIRET"), Some("12345678901234"));
        assert!(!parsed.is_spreadsheet);
        assert!(parsed.available_sheets.is_empty());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a;b;c\n1,2;3;4"), b';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(CsvParser::detect_delimiter("a,b;c"), b',');
        assert_eq!(CsvParser::detect_delimiter("single"), b',');
    }

    #[test]
    fn test_csv_semicolon_with_latin1() {
        // "Société" 的 Latin-1 编码: é = 0xE9
        let mut bytes = b"Nom;Ville\nSoci".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"t");
        bytes.push(0xE9);
        bytes.extend_from_slice(b";Rennes\n");

        let parsed = CsvParser.parse(&bytes, None).unwrap();
        assert_eq!(parsed.rows[0].get("Nom"), Some("Société"));
        assert_eq!(parsed.rows[0].get("Ville"), Some("Rennes"));
    }

    #[test]
    fn test_csv_utf8_bom_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("Entreprise\nAcme\n".as_bytes());
        let parsed = CsvParser.parse(&bytes, None).unwrap();
        assert_eq!(parsed.headers, vec!["Entreprise"]);
    }

    #[test]
    fn test_csv_skip_blank_rows_numbering() {
        let content = "Nom,Ville\nA,Rennes\n,\nB,Brest\n";
        let parsed = CsvParser.parse(content.as_bytes(), None).unwrap();

        // 空行被跳过，行号只计保留的数据行
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].row_number, 2);
        assert_eq!(parsed.rows[1].get("Nom"), Some("B"));
    }

    #[test]
    fn test_csv_short_rows_padded() {
        let content = "a,b,c\n1\n";
        let parsed = CsvParser.parse(content.as_bytes(), None).unwrap();
        assert_eq!(parsed.rows[0].get("c"), Some(""));
    }

    #[test]
    fn test_csv_header_only_is_empty_file() {
        let result = CsvParser.parse(b"Nom,Ville\n", None);
        assert!(matches!(result, Err(ImportError::EmptyFile(_))));

        let result = CsvParser.parse(b"   \n", None);
        assert!(matches!(result, Err(ImportError::EmptyFile(_))));
    }

    #[test]
    fn test_csv_binary_is_unreadable() {
        let result = CsvParser.parse(b"a,b\n\x00\x01,2\n", None);
        assert!(matches!(result, Err(ImportError::UnreadableFile(_))));
    }

    #[test]
    fn test_sanitize_headers() {
        let headers = sanitize_headers(vec![
            " Nom ".to_string(),
            "".to_string(),
            "Nom".to_string(),
        ]);
        assert_eq!(headers, vec!["Nom", "Column 2", "Nom (2)"]);
    }

    #[test]
    fn test_file_format_from_declared() {
        assert_eq!(FileFormat::from_declared("csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_declared(".XLSX"), Some(FileFormat::Xlsx));
        assert_eq!(FileFormat::from_declared("clients.xls"), Some(FileFormat::Xls));
        assert_eq!(FileFormat::from_declared("text/csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_declared("pdf"), None);
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            UniversalFileParser::resolve_format(b"PK\x03\x04rest", Some("data.bin")).unwrap(),
            FileFormat::Xlsx
        );
        assert_eq!(
            UniversalFileParser::resolve_format(b"a,b\n1,2", None).unwrap(),
            FileFormat::Csv
        );
        assert!(matches!(
            UniversalFileParser::resolve_format(b"%PDF-1.4", Some("report.pdf")),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_universal_parser_empty_bytes() {
        let result = UniversalFileParser.parse(b"", Some("csv"), None);
        assert!(matches!(result, Err(ImportError::EmptyFile(_))));
    }

    #[test]
    fn test_corrupt_xlsx_is_unreadable() {
        let result = UniversalFileParser.parse(b"PK\x03\x04garbage", Some("xlsx"), None);
        assert!(matches!(result, Err(ImportError::UnreadableFile(_))));
    }

    #[test]
    fn test_cell_to_string_integral_float() {
        assert_eq!(cell_to_string(&Data::Float(12345678901234.0)), "12345678901234");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_cell_to_string_date_cells() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        // 42064 = 2015-03-01
        let date = Data::DateTime(ExcelDateTime::new(42064.0, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_to_string(&date), "2015-03-01");

        let with_time =
            Data::DateTime(ExcelDateTime::new(42064.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_to_string(&with_time), "2015-03-01 12:00:00");

        let iso = Data::DateTimeIso("2015-03-01".to_string());
        assert_eq!(cell_to_string(&iso), "2015-03-01");
    }
}
