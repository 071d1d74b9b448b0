//! Basic example of workset_pool usage: a map phase followed by a reduce
//! phase, run over loopback RPC workers.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use workset_pool::proto::taskpool::{DoTaskArgs, TaskPhase};
use workset_pool::{
    PoolConfig, PoolEvent, RemoteCall, RemoteTask, RpcClient, RpcServer, TaskService, WorkerPool,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let runtime = tokio::runtime::Runtime::new()?;
    let mut workers = Vec::new();
    for _ in 0..3 {
        let service = TaskService::new(|args: &DoTaskArgs| {
            info!("{:?} task {} running", args.phase(), args.task_id);
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        });
        let server = runtime.block_on(RpcServer::bind("127.0.0.1:0", Arc::new(service)))?;
        workers.push((server.local_addr()?.to_string(), server.handle()));
        runtime.spawn(server.serve());
    }

    let config = PoolConfig::default();
    let client: Arc<dyn RemoteCall> = Arc::new(RpcClient::new(&config)?);
    let pool = WorkerPool::start_with_config(config)?;
    for (address, _) in &workers {
        pool.register_new_worker(address.clone());
    }

    for (phase, count) in [(TaskPhase::Map, 8), (TaskPhase::Reduce, 3)] {
        let tasks = (0..count)
            .map(|i| {
                let id = format!("{:?}-{}", phase, i).to_lowercase();
                RemoteTask::new(id, phase, Vec::new(), Arc::clone(&client)).shared()
            })
            .collect();
        let events = pool.begin_new_work_set(tasks)?;
        while let Ok(event) = events.recv() {
            println!("{:?} phase: {:?}", phase, event);
            if event != PoolEvent::Commenced {
                break;
            }
        }
    }

    pool.shutdown()?;
    for (_, handle) in workers {
        handle.shutdown();
    }
    Ok(())
}
