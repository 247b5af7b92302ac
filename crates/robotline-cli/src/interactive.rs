//! Interactive driver: a line-oriented prompt over the decision interface.
//!
//! Each prompt shows the current tick; commands inspect the world, submit or
//! cancel orders, and advance time. Time only moves on `tick`, so the player
//! can issue any number of orders per tick.

use anyhow::Result;
use robotline_core::fixed::money_to_f64;
use robotline_core::id::RobotId;
use robotline_core::order::Order;
use robotline_core::robot::Action;
use robotline_core::scheduler::Scheduler;
use std::io::{self, BufRead, Write};

const HELP: &str = "\
commands:
  status              show tick, money, stockpile, and robots
  orders              list every currently legal order
  do <n>              submit legal order number <n>
  submit <robot> <action> [target]
                      submit an order directly (actions: mine, assemble,
                      build-robot, sell, move)
  cancel <robot>      abort a robot's in-flight action (full refund)
  tick [n]            advance time by n ticks (default 1)
  help                show this help
  quit                exit";

pub fn run(mut sched: Scheduler) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout();

    println!("production line ready; type 'help' for commands");
    print_status(&sched);

    loop {
        print!("[tick {}] > ", sched.world().tick());
        out.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(()); // EOF
        }
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match command {
            "help" => println!("{HELP}"),
            "status" => print_status(&sched),
            "orders" => print_orders(&sched),
            "do" => do_order(&mut sched, &args),
            "submit" => submit_order(&mut sched, &args),
            "cancel" => cancel_order(&mut sched, &args),
            "tick" => advance(&mut sched, &args),
            "quit" | "exit" => return Ok(()),
            other => println!("unknown command '{other}'; type 'help'"),
        }

        if sched.is_over() {
            println!("run over at tick {}", sched.world().tick());
            print_status(&sched);
            return Ok(());
        }
    }
}

fn print_status(sched: &Scheduler) {
    let snap = sched.snapshot();
    println!(
        "tick {} | money {:.2} | {} robots",
        snap.tick,
        money_to_f64(snap.money),
        snap.robots.len()
    );
    if snap.stockpile.is_empty() {
        println!("  stockpile: (empty)");
    } else {
        for entry in &snap.stockpile {
            println!("  stockpile: {} x{}", entry.name, entry.quantity);
        }
    }
    for robot in &snap.robots {
        let at = robot.location.as_deref().unwrap_or("nowhere");
        match &robot.busy {
            Some(busy) => {
                let target = busy.target.as_deref().unwrap_or("-");
                println!(
                    "  robot {} @ {at}: {} {} (done at tick {})",
                    robot.id, busy.action, target, busy.completes_at
                );
            }
            None => println!("  robot {} @ {at}: idle", robot.id),
        }
    }
}

fn print_orders(sched: &Scheduler) {
    let legal = sched.legal_orders();
    if legal.is_empty() {
        println!("no legal orders; try 'tick'");
        return;
    }
    for (index, order) in legal.iter().enumerate() {
        println!("  {index}: {order}");
    }
}

fn do_order(sched: &mut Scheduler, args: &[&str]) {
    let Some(index) = args.first().and_then(|a| a.parse::<usize>().ok()) else {
        println!("usage: do <n>");
        return;
    };
    let legal = sched.legal_orders();
    let Some(order) = legal.get(index).cloned() else {
        println!("no legal order {index}; see 'orders'");
        return;
    };
    report_submit(sched, order);
}

fn submit_order(sched: &mut Scheduler, args: &[&str]) {
    let (Some(robot), Some(action)) = (
        args.first().and_then(|a| a.parse::<u32>().ok()),
        args.get(1).and_then(|a| Action::parse(a)),
    ) else {
        println!("usage: submit <robot> <action> [target]");
        return;
    };
    let target = args.get(2).map(|t| t.to_string());
    report_submit(sched, Order::new(RobotId(robot), action, target));
}

fn report_submit(sched: &mut Scheduler, order: Order) {
    let description = order.to_string();
    match sched.submit(order) {
        Ok(completes_at) => println!("accepted: {description} (done at tick {completes_at})"),
        Err(err) => println!("rejected: {err}"),
    }
}

fn cancel_order(sched: &mut Scheduler, args: &[&str]) {
    let Some(robot) = args.first().and_then(|a| a.parse::<u32>().ok()) else {
        println!("usage: cancel <robot>");
        return;
    };
    match sched.cancel(RobotId(robot)) {
        Ok(()) => println!("cancelled; reservation refunded"),
        Err(err) => println!("rejected: {err}"),
    }
}

fn advance(sched: &mut Scheduler, args: &[&str]) {
    let ticks = args
        .first()
        .and_then(|a| a.parse::<u64>().ok())
        .unwrap_or(1);
    for _ in 0..ticks {
        if sched.is_over() {
            break;
        }
        for completion in sched.advance_tick() {
            let verdict = if completion.success { "done" } else { "failed" };
            println!(
                "  tick {}: robot {} {verdict}: {}",
                completion.completed_at, completion.robot, completion.order
            );
        }
    }
    print_status(sched);
}
