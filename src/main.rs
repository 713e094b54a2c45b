// ==========================================
// 课表一致性引擎 - 命令行入口
// ==========================================
// 用法:
//   timetable-engine overlaps <file>
//   timetable-engine merge <file>...
//   timetable-engine transfer <file> <group> <week> <weekday> <time> <subject>
//   timetable-engine free-rooms <file> <week> <weekday> <time> [building|all|other]
//   timetable-engine workload <file> <teacher>
//   timetable-engine search <file> [group=..] [subject=..] [type=л.|пр.|лаб.]
//   timetable-engine upload [--resolve 3=merge,4=replace] <file>...
// 输出: JSON 到 stdout, 日志到 stderr（TIMETABLE_LOG_FORMAT=json 时为 JSON 日志）
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use timetable_engine::app::{get_default_db_path, AppState};
use timetable_engine::config::EngineConfig;
use timetable_engine::domain::{BeginOutcome, Resolution, Snapshot};
use timetable_engine::engine::{
    search_timetable, teacher_workload, BuildingFilter, OverlapDetector, RoomFinder, SearchQuery,
    TransferRecommender, WeekMerger,
};
use timetable_engine::importer::JsonFragmentParser;
use timetable_engine::TeacherName;

const USAGE: &str = "用法: timetable-engine <overlaps|merge|transfer|free-rooms|workload|search|upload> ...";

fn main() -> Result<()> {
    match std::env::var("TIMETABLE_LOG_FORMAT").as_deref() {
        Ok("json") => timetable_engine::logging::init_json(),
        _ => timetable_engine::logging::init(),
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    tracing::debug!(command = %command, version = timetable_engine::VERSION, "执行命令");

    match command.as_str() {
        "overlaps" => overlaps(rest),
        "merge" => merge(rest),
        "transfer" => transfer(rest),
        "free-rooms" => free_rooms(rest),
        "workload" => workload(rest),
        "search" => search(rest),
        "upload" => upload(rest),
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }
}

// ==========================================
// 命令实现
// ==========================================

fn overlaps(args: &[String]) -> Result<()> {
    let [file] = args else {
        bail!("用法: overlaps <file>");
    };
    let snapshot = load_snapshot(&[file.clone()])?;
    let report = OverlapDetector::from_config(&EngineConfig::default()).find_all(&snapshot)?;
    print_json(&report)
}

fn merge(args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("用法: merge <file>...");
    }
    let fragments = read_fragments(args)?;
    let report = WeekMerger::new().merge_with_report(fragments)?;
    print_json(&report)
}

fn transfer(args: &[String]) -> Result<()> {
    let [file, group, week, weekday, time, subject] = args else {
        bail!("用法: transfer <file> <group> <week> <weekday> <time> <subject>");
    };
    let (week, weekday, time) = parse_slot(week, weekday, time)?;
    let snapshot = load_snapshot(&[file.clone()])?;

    let lesson = snapshot
        .week(week)
        .and_then(|w| w.group(group))
        .and_then(|g| g.day(weekday))
        .and_then(|d| d.lessons_at(time).find(|l| &l.subject == subject))
        .cloned()
        .ok_or_else(|| {
            anyhow!(
                "未找到课程: group={} week={} weekday={} time={} subject={}",
                group,
                week,
                weekday,
                time,
                subject
            )
        })?;

    let options = TransferRecommender::new(EngineConfig::default())
        .find_options(&snapshot, group, &lesson, week, weekday, time)?;
    print_json(&options)
}

fn free_rooms(args: &[String]) -> Result<()> {
    let (file, week, weekday, time, filter) = match args {
        [file, week, weekday, time] => (file, week, weekday, time, BuildingFilter::All),
        [file, week, weekday, time, building] => {
            (file, week, weekday, time, building.parse::<BuildingFilter>().unwrap_or_default())
        }
        _ => bail!("用法: free-rooms <file> <week> <weekday> <time> [building|all|other]"),
    };
    let (week, weekday, time) = parse_slot(week, weekday, time)?;
    let snapshot = load_snapshot(&[file.clone()])?;

    let rooms = RoomFinder::new(&EngineConfig::default())
        .find_free_rooms(&snapshot, week, weekday, time, &filter)?;
    print_json(&rooms)
}

fn workload(args: &[String]) -> Result<()> {
    let [file, teacher] = args else {
        bail!("用法: workload <file> <teacher>");
    };
    let snapshot = load_snapshot(&[file.clone()])?;
    let report = teacher_workload(&snapshot, &TeacherName::from(teacher.as_str()))?;
    print_json(&report)
}

fn search(args: &[String]) -> Result<()> {
    let Some((file, filters)) = args.split_first() else {
        bail!("用法: search <file> [group=..] [subject=..] [type=..]");
    };
    let mut query = SearchQuery::default();
    for filter in filters {
        match filter.split_once('=') {
            Some(("group", value)) => query.group = Some(value.to_string()),
            Some(("subject", value)) => query.subject = Some(value.to_string()),
            Some(("type", value)) => {
                query.kind = Some(
                    serde_json::from_value(serde_json::Value::String(value.to_string()))
                        .with_context(|| format!("课程类型格式错误: {}", value))?,
                )
            }
            _ => bail!("未知过滤条件: {}", filter),
        }
    }
    let snapshot = load_snapshot(&[file.clone()])?;
    print_json(&search_timetable(&snapshot, &query)?)
}

/// 上传到默认数据库; 有周次冲突且未给出决策时只输出冲突并放弃本次上传
fn upload(args: &[String]) -> Result<()> {
    let (decisions, files) = match args {
        [flag, raw, files @ ..] if flag == "--resolve" => (Some(parse_decisions(raw)?), files),
        files => (None, files),
    };
    if files.is_empty() {
        bail!("用法: upload [--resolve 3=merge,4=replace] <file>...");
    }

    let payloads = files
        .iter()
        .map(|f| {
            let bytes = std::fs::read(f).with_context(|| format!("读取文件失败: {}", f))?;
            Ok((source_name(f), bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    let state = AppState::new(get_default_db_path()).map_err(|e| anyhow!(e))?;
    let api = &state.timetable_api;

    match api.upload(&payloads, Some("cli"))? {
        BeginOutcome::Committed(report) => print_json(&report),
        BeginOutcome::AwaitingResolution { token, conflicts } => match decisions {
            Some(decisions) => print_json(&api.resolve_upload(token, &decisions, Some("cli"))?),
            None => {
                api.discard_upload(token)?;
                tracing::warn!(collisions = conflicts.len(), "存在周次冲突, 未写入; 使用 --resolve 指定决策");
                print_json(&conflicts)
            }
        },
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn source_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

fn read_fragments(files: &[String]) -> Result<Vec<timetable_engine::Week>> {
    let mut weeks = Vec::new();
    for file in files {
        let fragment = JsonFragmentParser
            .parse_file(Path::new(file))
            .with_context(|| format!("解析文件失败: {}", file))?;
        weeks.extend(fragment.weeks);
    }
    Ok(weeks)
}

/// 读取文件并归并为快照（同一周次的片段先合并）
fn load_snapshot(files: &[String]) -> Result<Snapshot> {
    let weeks = WeekMerger::new().merge_weeks(read_fragments(files)?)?;
    Ok(Snapshot::new(weeks))
}

fn parse_slot(week: &str, weekday: &str, time: &str) -> Result<(u32, u8, u8)> {
    Ok((
        week.parse().with_context(|| format!("周次格式错误: {}", week))?,
        weekday.parse().with_context(|| format!("星期格式错误: {}", weekday))?,
        time.parse().with_context(|| format!("节次格式错误: {}", time))?,
    ))
}

/// 解析 "3=merge,4=replace"
fn parse_decisions(raw: &str) -> Result<HashMap<u32, Resolution>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (week, resolution) = part
                .split_once('=')
                .ok_or_else(|| anyhow!("决策格式错误: {}", part))?;
            let week: u32 = week
                .trim()
                .parse()
                .with_context(|| format!("周次格式错误: {}", week))?;
            let resolution: Resolution = resolution.parse().map_err(|e: String| anyhow!(e))?;
            Ok((week, resolution))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
